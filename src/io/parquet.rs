use arrow::{compute::concat_batches, record_batch::RecordBatch};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::File,
    io::{Seek, SeekFrom, Write},
};

use crate::error::{MettoolError, Result};

/// Read every row group of a Parquet file into one batch.
pub fn read_parquet_file(file: File) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| MettoolError::load(format!("opening parquet: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(64 * 1024)
        .build()
        .map_err(|e| MettoolError::load(format!("building parquet reader: {e}")))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MettoolError::load(format!("reading parquet: {e}")))?;
    Ok(concat_batches(&schema, &batches)?)
}

/// In-memory Parquet goes through an anonymous temp file.
pub fn read_parquet_bytes(data: &[u8]) -> Result<RecordBatch> {
    let spill = || -> std::io::Result<File> {
        let mut file = tempfile::tempfile()?;
        file.write_all(data)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    };
    let file = spill().map_err(|e| MettoolError::load(format!("buffering parquet: {e}")))?;
    read_parquet_file(file)
}
