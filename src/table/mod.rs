pub mod convert;
pub mod date_parser;
pub mod schema;
pub mod utils;

use arrow::{
    array::{Array, ArrayRef, TimestampMillisecondArray, UInt32Array},
    compute::{concat_batches, take},
    datatypes::{DataType, Field, FieldRef, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::{MettoolError, Result};
use crate::table::date_parser::format_day;

/// Storage type of every coerced date column.
pub const TIMESTAMP_TYPE: DataType = DataType::Timestamp(TimeUnit::Millisecond, None);

/// The dataset exactly as it was loaded. Never mutated; shared by reference.
#[derive(Debug, Clone)]
pub struct RawTable {
    batch: RecordBatch,
}

impl RawTable {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn empty() -> Self {
        Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.batch)
    }
}

/// A selected and cleaned view of the raw table, owned by whoever produced it.
#[derive(Debug, Clone)]
pub struct WorkingTable {
    batch: RecordBatch,
}

impl WorkingTable {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn empty() -> Self {
        Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.batch)
    }

    /// Names of the columns stored with a numeric Arrow type, in table order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter(|f| f.data_type().is_numeric())
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| MettoolError::missing_column(name))
    }

    /// The column read as numbers, missing cells as `None`.
    pub fn values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let arr = self.column(name)?;
        Ok(convert::to_float64(arr).iter().collect())
    }

    /// The column read as millisecond timestamps.
    pub fn timestamps(&self, name: &str) -> Result<TimestampMillisecondArray> {
        let arr = self.column(name)?;
        Ok(convert::to_timestamp(arr))
    }

    /// The date column rendered as `YYYY-MM-DD`.
    pub fn day_strings(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self
            .timestamps(name)?
            .iter()
            .map(|v| v.and_then(format_day))
            .collect())
    }

    /// Swap in a new array for `name`, updating the field type to match.
    pub fn replace_column(&mut self, name: &str, array: ArrayRef) -> Result<()> {
        let schema = self.batch.schema();
        let idx = schema
            .index_of(name)
            .map_err(|_| MettoolError::missing_column(name))?;

        let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
        fields[idx] = Arc::new(Field::new(name, array.data_type().clone(), true));
        let mut columns = self.batch.columns().to_vec();
        columns[idx] = array;

        self.batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(())
    }

    /// Stable ascending sort on a date column; missing dates go last.
    pub fn sort_by_date(&mut self, name: &str) -> Result<()> {
        let ts = self.timestamps(name)?;
        let mut order: Vec<u32> = (0..ts.len() as u32).collect();
        order.sort_by_key(|&i| {
            let i = i as usize;
            if ts.is_null(i) {
                (1, 0)
            } else {
                (0, ts.value(i))
            }
        });

        let indices = UInt32Array::from(order);
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|c| take(c.as_ref(), &indices, None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.batch = RecordBatch::try_new(self.batch.schema(), columns)?;
        Ok(())
    }

    /// Stack tables with identical schemas, in order. No tables gives an empty table.
    pub fn concat(tables: &[WorkingTable]) -> Result<WorkingTable> {
        let Some(first) = tables.first() else {
            return Ok(WorkingTable::empty());
        };
        let schema = first.batch.schema();
        let batch = concat_batches(&schema, tables.iter().map(|t| &t.batch))?;
        Ok(WorkingTable::new(batch))
    }
}

fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::dated_batch;
    use super::*;
    use arrow::array::Float64Array;

    #[test]
    fn sorts_by_date_keeping_rows_together() {
        let batch = dated_batch(
            &["2023-01-03", "2023-01-01", "2023-01-02"],
            vec![("Flow", vec![Some(3.0), Some(1.0), None])],
        );
        let mut table = WorkingTable::new(batch);
        table.sort_by_date("Date").unwrap();

        assert_eq!(
            table.day_strings("Date").unwrap(),
            vec![
                Some("2023-01-01".to_string()),
                Some("2023-01-02".to_string()),
                Some("2023-01-03".to_string())
            ]
        );
        assert_eq!(table.values("Flow").unwrap(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn replace_column_updates_type() {
        let batch = dated_batch(&["2023-01-01"], vec![("Flow", vec![Some(1.0)])]);
        let mut table = WorkingTable::new(batch);
        table
            .replace_column("Date", Arc::new(Float64Array::from(vec![Some(9.0)])))
            .unwrap();
        assert_eq!(table.numeric_column_names(), vec!["Date", "Flow"]);
        assert!(matches!(
            table.replace_column("Nope", Arc::new(Float64Array::from(vec![Some(1.0)]))),
            Err(MettoolError::MissingColumn { .. })
        ));
    }

    #[test]
    fn concat_preserves_order_and_handles_empty() {
        let a = WorkingTable::new(dated_batch(&["2023-01-02"], vec![("Flow", vec![Some(2.0)])]));
        let b = WorkingTable::new(dated_batch(&["2023-01-01"], vec![("Flow", vec![Some(1.0)])]));
        let joined = WorkingTable::concat(&[a, b]).unwrap();
        assert_eq!(joined.values("Flow").unwrap(), vec![Some(2.0), Some(1.0)]);

        let none = WorkingTable::concat(&[]).unwrap();
        assert_eq!(none.num_rows(), 0);
        assert!(none.column_names().is_empty());
    }
}
