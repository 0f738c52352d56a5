use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder, WriterBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{io::Cursor, sync::Arc};
use tracing::debug;

use crate::error::{MettoolError, Result};
use crate::table::convert::convert_to_final_types;
use crate::table::schema::analyze_batch_for_schema;

const BATCH_SIZE: usize = 64 * 1024;

/// Parse a headed CSV buffer into a typed batch.
///
/// Every cell is first read as text; column types are then inferred from the
/// non-empty cells and the columns converted.
pub fn read_csv(data: &[u8]) -> Result<RecordBatch> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    // 1) header only, to get the column names
    let (header, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(data), Some(0))
        .map_err(|e| MettoolError::load(format!("reading CSV header: {e}")))?;

    // 2) read everything as text
    let text_schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(text_schema.clone())
        .with_header(true)
        .with_truncated_rows(true)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(data))
        .map_err(|e| MettoolError::load(format!("creating CSV reader: {e}")))?;
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MettoolError::load(format!("CSV parse error: {e}")))?;
    let text = concat_batches(&text_schema, &batches)?;

    // 3) infer + convert
    let info = analyze_batch_for_schema(&text);
    debug!(
        rows = text.num_rows(),
        columns = text.num_columns(),
        date_columns = ?info.date_columns,
        "parsed CSV"
    );
    convert_to_final_types(&text, &info)
}

/// Serialize a batch as headed CSV; dates as `YYYY-MM-DD HH:MM:SS`.
pub fn write_csv(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_timestamp_format("%Y-%m-%d %H:%M:%S".to_string())
            .build(&mut buf);
        writer.write(batch)?;
    }
    Ok(buf)
}
