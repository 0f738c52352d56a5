use arrow::{array::Array, record_batch::RecordBatch};
use tracing::debug;

use crate::error::Result;
use crate::table::convert::to_float64;

/// Missing fraction + zero fraction (numeric columns only) for every column.
///
/// A table with no rows scores every column as infinitely junky.
pub fn junk_scores(batch: &RecordBatch) -> Vec<f64> {
    let rows = batch.num_rows();
    batch
        .columns()
        .iter()
        .map(|arr| {
            if rows == 0 {
                return f64::INFINITY;
            }
            let (missing, zeros) = if arr.data_type().is_numeric() {
                let values = to_float64(arr);
                let zeros = values.iter().filter(|v| *v == Some(0.0)).count();
                (values.null_count(), zeros)
            } else {
                (arr.null_count(), 0)
            };
            (missing + zeros) as f64 / rows as f64
        })
        .collect()
}

/// Drop every column whose junk score reaches `threshold`, keeping
/// `date_column` unconditionally. Row count and column order are preserved.
pub fn prune_columns(batch: &RecordBatch, date_column: &str, threshold: f64) -> Result<RecordBatch> {
    let schema = batch.schema();
    let scores = junk_scores(batch);

    let keep: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(i, score)| schema.field(*i).name() == date_column || **score < threshold)
        .map(|(i, _)| i)
        .collect();

    let pruned = batch.project(&keep)?;
    let kept: Vec<&str> = keep.iter().map(|&i| schema.field(i).name().as_str()).collect();
    debug!(?kept, dropped = batch.num_columns() - keep.len(), "pruned junk columns");
    Ok(pruned)
}
