use arrow::error::ArrowError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MettoolError>;

/// Every failure the pipeline surfaces to its caller.
///
/// Unparseable cell values are not represented here: they become missing
/// values and flow through cleaning and statistics.
#[derive(Debug, Error)]
pub enum MettoolError {
    /// Source unreadable, malformed, or the requested sheet is absent.
    #[error("failed to load table: {reason}")]
    LoadFailure { reason: String },

    #[error("column \"{name}\" not found")]
    MissingColumn { name: String },

    #[error("range start {start} is after end {end}")]
    Range { start: String, end: String },

    #[error("unsupported file extension \"{extension}\"")]
    UnsupportedFormat { extension: String },

    #[error("cannot parse \"{literal}\" as a date")]
    InvalidDate { literal: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl MettoolError {
    pub(crate) fn load(reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn { name: name.into() }
    }
}
