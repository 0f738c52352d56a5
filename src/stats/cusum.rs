use crate::error::Result;
use crate::stats::{mean, present};
use crate::table::WorkingTable;

/// Running sum of deviations from the mean of `column`, in the table's
/// current row order. Sort the table first for a time trend.
pub fn cusum(table: &WorkingTable, column: &str) -> Result<Vec<Option<f64>>> {
    let values = table.values(column)?;
    Ok(cumulative_deviation(&values))
}

/// `out[i] = Σ_{j≤i} (x[j] - mean)`, mean taken over the present values.
///
/// Once a missing value is met, that index and every later one are `None`.
pub fn cumulative_deviation(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let Some(m) = mean(&present(values)) else {
        return vec![None; values.len()];
    };

    let mut acc = Some(0.0);
    values
        .iter()
        .map(|v| {
            acc = match (acc, v) {
                (Some(sum), Some(x)) => Some(sum + (x - m)),
                _ => None,
            };
            acc
        })
        .collect()
}
