use arrow::{
    array::{
        Array, ArrayRef, Float64Array, Float64Builder, LargeStringArray, StringArray,
        TimestampMillisecondArray, TimestampMillisecondBuilder,
    },
    compute::cast,
    datatypes::DataType,
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;
use crate::table::date_parser::{column_order, parse_timestamp_millis, DateOrder};
use crate::table::schema::SchemaInfo;
use crate::table::utils::parse_number;
use crate::table::TIMESTAMP_TYPE;

/// Convert string columns into your final types
pub fn convert_to_final_types(batch: &RecordBatch, schema_info: &SchemaInfo) -> Result<RecordBatch> {
    let mut out = Vec::with_capacity(batch.num_columns());

    for (arr, fld) in batch.columns().iter().zip(schema_info.schema.fields()) {
        let converted = match fld.data_type() {
            DataType::Float64 => Arc::new(to_float64(arr)) as ArrayRef,
            ty if *ty == TIMESTAMP_TYPE => {
                Arc::new(to_timestamp(arr)) as ArrayRef
            }
            _ => arr.clone(),
        };
        out.push(converted);
    }

    let schema = Arc::new(schema_info.schema.clone());
    Ok(RecordBatch::try_new(schema, out)?)
}

/// Coerce any column to `Float64`.
///
/// Text is parsed cell by cell, numeric and boolean columns are cast, and
/// anything else becomes an all-missing column. NaN is mapped to missing.
pub fn to_float64(arr: &ArrayRef) -> Float64Array {
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        return sarr.iter().map(|opt| opt.and_then(parse_number)).collect();
    }
    if let Some(sarr) = arr.as_any().downcast_ref::<LargeStringArray>() {
        return sarr.iter().map(|opt| opt.and_then(parse_number)).collect();
    }

    let castable = arr.data_type().is_numeric() || *arr.data_type() == DataType::Boolean;
    let cast_result = if castable {
        cast(arr, &DataType::Float64).ok()
    } else {
        None
    };

    match cast_result
        .as_ref()
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
    {
        Some(farr) => farr.iter().map(|v| v.filter(|x| !x.is_nan())).collect(),
        None => {
            if *arr.data_type() != DataType::Null {
                warn!(data_type = ?arr.data_type(), "column cannot be read as numbers");
            }
            let mut b = Float64Builder::with_capacity(arr.len());
            b.append_nulls(arr.len());
            b.finish()
        }
    }
}

/// Coerce any column to millisecond timestamps; unparseable cells become missing.
///
/// Text columns get a single day/month ordering, picked from all their cells.
pub fn to_timestamp(arr: &ArrayRef) -> TimestampMillisecondArray {
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        let order = column_order(sarr.iter().flatten());
        return parse_text_dates(sarr.iter(), arr.len(), order);
    }
    if let Some(sarr) = arr.as_any().downcast_ref::<LargeStringArray>() {
        let order = column_order(sarr.iter().flatten());
        return parse_text_dates(sarr.iter(), arr.len(), order);
    }

    let temporal = matches!(
        arr.data_type(),
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
    );
    let cast_result = if temporal {
        cast(arr, &TIMESTAMP_TYPE).ok()
    } else {
        None
    };

    match cast_result
        .as_ref()
        .and_then(|c| c.as_any().downcast_ref::<TimestampMillisecondArray>())
    {
        Some(ts) => ts.clone(),
        None => {
            if *arr.data_type() != DataType::Null {
                warn!(data_type = ?arr.data_type(), "column cannot be read as dates");
            }
            let mut b = TimestampMillisecondBuilder::with_capacity(arr.len());
            b.append_nulls(arr.len());
            b.finish()
        }
    }
}

fn parse_text_dates<'a>(
    cells: impl Iterator<Item = Option<&'a str>>,
    len: usize,
    order: DateOrder,
) -> TimestampMillisecondArray {
    let mut b = TimestampMillisecondBuilder::with_capacity(len);
    for opt in cells {
        b.append_option(opt.and_then(|s| parse_timestamp_millis(s, order)));
    }
    b.finish()
}
