//! Filtering and statistics over time-stamped measurement sheets.
//!
//! A sheet is loaded into a [`pipeline::Pipeline`], which hides near-empty
//! columns from its listing and answers three kinds of request: a
//! correlation heatmap, per-column CUSUM trends and a multi-period control
//! chart. Every request selects a date range from the untouched raw table,
//! cleans it, computes its plot data and re-exports the cleaned rows as a
//! workbook.

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod results;
pub mod stats;
pub mod table;

pub use config::{AnalysisConfig, PeriodSpec};
pub use error::{MettoolError, Result};
pub use io::Source;
pub use pipeline::Pipeline;
