//! Statistics over working-table columns.
//!
//! Every function here works on `Option<f64>` slices where `None` is a
//! missing cell. Results that cannot be computed are `None` rather than NaN so
//! they serialize as `null`.

pub mod correlation;
pub mod cusum;
pub mod limits;

pub use correlation::{correlation, pearson, CorrelationMatrix};
pub use cusum::{cumulative_deviation, cusum};
pub use limits::{control_limits, limits_for, ControlLimits};

use crate::error::Result;
use crate::table::WorkingTable;

/// Non-missing values, in order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    let n = values.len();
    if n <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - ddof) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` in [0, 1]; `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Mean of a column's non-missing values.
pub fn column_mean(table: &WorkingTable, column: &str) -> Result<Option<f64>> {
    let values = table.values(column)?;
    Ok(mean(&present(&values)))
}
