use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{MettoolError, Result};
use crate::pipeline::clean::{CleanOptions, OutlierMethod};
use crate::pipeline::DEFAULT_DATE_COLUMN;

/// Everything a caller can set for one analysis request.
///
/// Keys are camelCase in YAML/JSON. Unset keys take the defaults of the
/// standard pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub date_column: String,
    pub range_start: String,
    pub range_end: String,
    pub columns: Vec<String>,
    pub replace_zero: bool,
    pub remove_outliers: bool,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub confidence_pct: f64,
    pub periods: Vec<PeriodSpec>,
    pub target_column: String,
    pub show_limits: bool,
    pub show_average: bool,
}

/// A period as typed by the caller; parsed into a `Period` before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            range_start: String::new(),
            range_end: String::new(),
            columns: Vec::new(),
            replace_zero: true,
            remove_outliers: false,
            outlier_method: OutlierMethod::ZScore,
            outlier_threshold: 3.0,
            confidence_pct: 95.0,
            periods: Vec::new(),
            target_column: String::new(),
            show_limits: true,
            show_average: true,
        }
    }
}

impl AnalysisConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| MettoolError::Config(format!("reading {}: {e}", path.display())))?;

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let cfg: Self = match ext.as_str() {
            "json" => serde_json::from_str(&text)
                .map_err(|e| MettoolError::Config(format!("{}: {e}", path.display())))?,
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .map_err(|e| MettoolError::Config(format!("{}: {e}", path.display())))?,
            other => {
                return Err(MettoolError::Config(format!(
                    "unsupported config extension \"{other}\""
                )))
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_pct > 0.0 && self.confidence_pct < 100.0) {
            return Err(MettoolError::InvalidParameter {
                reason: format!(
                    "confidencePct must be within (0, 100), got {}",
                    self.confidence_pct
                ),
            });
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err(MettoolError::InvalidParameter {
                reason: format!(
                    "outlierThreshold must be a non-negative number, got {}",
                    self.outlier_threshold
                ),
            });
        }
        Ok(())
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            replace_zero: self.replace_zero,
            remove_outliers: self.remove_outliers,
            method: self.outlier_method.clone(),
            threshold: self.outlier_threshold,
        }
    }
}
