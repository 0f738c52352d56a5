use arrow::{
    array::{ArrayRef, BooleanArray},
    compute::filter_record_batch,
    datatypes::{Field, FieldRef, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::info;

use crate::error::{MettoolError, Result};
use crate::table::convert::to_timestamp;
use crate::table::date_parser::{parse_datetime, DateOrder};
use crate::table::{RawTable, WorkingTable, TIMESTAMP_TYPE};

/// Inclusive date interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Parse both bounds with the ordering picked by the `start` literal:
    /// day-first when it contains `/`, year-first/ISO otherwise.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let order = DateOrder::for_literal(start);
        let parse = |s: &str| {
            parse_datetime(s, order).ok_or_else(|| MettoolError::InvalidDate {
                literal: s.to_string(),
            })
        };
        let (start_dt, end_dt) = (parse(start)?, parse(end)?);

        if start_dt > end_dt {
            return Err(MettoolError::Range {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start: start_dt,
            end: end_dt,
        })
    }

    fn millis(&self) -> (i64, i64) {
        (
            self.start.and_utc().timestamp_millis(),
            self.end.and_utc().timestamp_millis(),
        )
    }
}

/// Rows of `table` whose date falls inside `range`, projected onto `columns`
/// with the date column appended last when not requested.
///
/// The date column comes back as timestamps; cells that do not parse are
/// missing and never match. Source row order is kept.
pub fn select(
    table: &RawTable,
    date_column: &str,
    range: &DateRange,
    columns: &[String],
) -> Result<WorkingTable> {
    let batch = table.batch();
    let schema = batch.schema();
    let date_idx = schema
        .index_of(date_column)
        .map_err(|_| MettoolError::missing_column(date_column))?;

    // 1) coerce the date column and build the inclusive mask
    let dates = to_timestamp(batch.column(date_idx));
    let (lo, hi) = range.millis();
    let mask: BooleanArray = dates
        .iter()
        .map(|v| Some(matches!(v, Some(ts) if ts >= lo && ts <= hi)))
        .collect();

    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    fields[date_idx] = Arc::new(Field::new(date_column, TIMESTAMP_TYPE, true));
    let mut arrays = batch.columns().to_vec();
    arrays[date_idx] = Arc::new(dates) as ArrayRef;
    let coerced = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;

    // 2) project onto the requested columns
    let mut wanted: Vec<&str> = columns.iter().map(String::as_str).collect();
    if !wanted.contains(&date_column) {
        wanted.push(date_column);
    }
    let indices = wanted
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| MettoolError::missing_column(*name))
        })
        .collect::<Result<Vec<_>>>()?;
    let projected = coerced.project(&indices)?;

    // 3) apply the row mask
    let selected = filter_record_batch(&projected, &mask)?;
    info!(rows = selected.num_rows(), columns = wanted.len(), "selected date range");
    Ok(WorkingTable::new(selected))
}

/// Parse the bounds and select in one step.
pub fn select_range(
    table: &RawTable,
    date_column: &str,
    start: &str,
    end: &str,
    columns: &[String],
) -> Result<WorkingTable> {
    let range = DateRange::parse(start, end)?;
    select(table, date_column, &range, columns)
}
