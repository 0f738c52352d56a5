use arrow::{
    array::{Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};

use crate::table::utils::{clean_str, infer_arrow_dtype_from_str};
use crate::table::TIMESTAMP_TYPE;

/// Holds final schema + which cols need date-parsing
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    pub schema: Schema,
    pub date_columns: Vec<String>,
}

/// Analyze an all-text batch and pick a final type per column.
///
/// A column is numeric when every non-empty cell parses as a number, a date
/// column when every non-empty cell parses as a date, text otherwise. Columns
/// with no values at all stay text.
pub fn analyze_batch_for_schema(batch: &RecordBatch) -> SchemaInfo {
    let schema = batch.schema();
    let mut final_fields = Vec::with_capacity(schema.fields().len());
    let mut date_columns = Vec::new();

    for (i, field) in schema.fields().iter().enumerate() {
        let ty = batch
            .column(i)
            .as_any()
            .downcast_ref::<StringArray>()
            .map(infer_column_type)
            .unwrap_or_else(|| field.data_type().clone());

        if ty == TIMESTAMP_TYPE {
            date_columns.push(field.name().clone());
        }
        final_fields.push(Field::new(field.name(), ty, true));
    }

    SchemaInfo {
        schema: Schema::new(final_fields),
        date_columns,
    }
}

fn infer_column_type(arr: &StringArray) -> DataType {
    let mut seen: Option<DataType> = None;
    for raw in arr.iter().flatten() {
        if clean_str(raw).is_empty() {
            continue;
        }
        let ty = infer_arrow_dtype_from_str(raw);
        match &seen {
            None => seen = Some(ty),
            Some(prev) if *prev == ty => {}
            Some(_) => return DataType::Utf8,
        }
    }
    seen.unwrap_or(DataType::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::ArrayRef;
    use std::sync::Arc;

    fn text_batch(cols: Vec<(&str, Vec<Option<&str>>)>) -> RecordBatch {
        let fields: Vec<Field> = cols
            .iter()
            .map(|(n, _)| Field::new(*n, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = cols
            .into_iter()
            .map(|(_, v)| Arc::new(StringArray::from(v)) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    #[test]
    fn picks_numeric_date_and_text() {
        let batch = text_batch(vec![
            ("Date", vec![Some("2023-01-01"), Some("2023-01-02"), None]),
            ("Flow", vec![Some("1.5"), Some(""), Some("0")]),
            ("Note", vec![Some("ok"), Some("3"), None]),
            ("Empty", vec![None, None, None]),
        ]);
        let info = analyze_batch_for_schema(&batch);
        let types: Vec<_> = info
            .schema
            .fields()
            .iter()
            .map(|f| f.data_type().clone())
            .collect();
        assert_eq!(
            types,
            vec![TIMESTAMP_TYPE, DataType::Float64, DataType::Utf8, DataType::Utf8]
        );
        assert_eq!(info.date_columns, vec!["Date".to_string()]);
    }
}
