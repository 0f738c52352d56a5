pub mod csv;
pub mod parquet;
pub mod workbook;

use std::{
    fs::{self, File},
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};

use crate::error::{MettoolError, Result};
use crate::table::RawTable;

/// Sheet name reported for single-table in-memory buffers.
pub const BUFFER_SHEET: &str = "Sheet1";

/// Where a table comes from.
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for Source {
    fn from(p: PathBuf) -> Self {
        Source::Path(p)
    }
}

impl From<&Path> for Source {
    fn from(p: &Path) -> Self {
        Source::Path(p.to_path_buf())
    }
}

impl From<Vec<u8>> for Source {
    fn from(b: Vec<u8>) -> Self {
        Source::Bytes(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
    Parquet,
}

impl SourceFormat {
    /// Pick the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "zip" => Ok(SourceFormat::Workbook),
            "parquet" => Ok(SourceFormat::Parquet),
            _ => Err(MettoolError::UnsupportedFormat { extension: ext }),
        }
    }

    /// Pick the format of an in-memory buffer from its magic bytes.
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
            SourceFormat::Workbook
        } else if data.starts_with(b"PAR1") {
            SourceFormat::Parquet
        } else {
            SourceFormat::Csv
        }
    }
}

impl Source {
    pub fn format(&self) -> Result<SourceFormat> {
        match self {
            Source::Path(p) => SourceFormat::from_path(p),
            Source::Bytes(b) => Ok(SourceFormat::sniff(b)),
        }
    }

    /// Sheet name of a single-table source.
    fn single_sheet_name(&self) -> String {
        match self {
            Source::Path(p) => p
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(BUFFER_SHEET)
                .to_string(),
            Source::Bytes(_) => BUFFER_SHEET.to_string(),
        }
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Source::Path(p) => fs::read(p)
                .map_err(|e| MettoolError::load(format!("reading {}: {e}", p.display()))),
            Source::Bytes(b) => Ok(b.clone()),
        }
    }
}

/// Sheet names of `source`, in order. Empty when the source cannot be read.
pub fn list_sheets(source: &Source) -> Vec<String> {
    match try_list_sheets(source) {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "failed to list sheets");
            Vec::new()
        }
    }
}

fn try_list_sheets(source: &Source) -> Result<Vec<String>> {
    match source.format()? {
        SourceFormat::Workbook => workbook::sheet_names(Cursor::new(source.read_bytes()?)),
        SourceFormat::Csv | SourceFormat::Parquet => Ok(vec![source.single_sheet_name()]),
    }
}

/// Load one sheet of `source` as a raw table.
///
/// An unrecognised path extension fails with `UnsupportedFormat` before
/// anything is read; every other failure is a `LoadFailure`.
#[tracing::instrument(level = "info", skip(source))]
pub fn load_table(source: &Source, sheet: &str) -> Result<RawTable> {
    let format = source.format()?;
    debug!(?format, "loading table");

    let batch = match format {
        SourceFormat::Workbook => {
            let data = workbook::read_sheet(Cursor::new(source.read_bytes()?), sheet)?;
            csv::read_csv(&data)?
        }
        SourceFormat::Csv | SourceFormat::Parquet => {
            let expected = source.single_sheet_name();
            if sheet != expected {
                return Err(MettoolError::load(format!(
                    "sheet \"{sheet}\" not found (only \"{expected}\")"
                )));
            }
            match (format, source) {
                (SourceFormat::Parquet, Source::Path(p)) => {
                    let file = File::open(p)
                        .map_err(|e| MettoolError::load(format!("opening {}: {e}", p.display())))?;
                    parquet::read_parquet_file(file)?
                }
                (SourceFormat::Parquet, Source::Bytes(b)) => parquet::read_parquet_bytes(b)?,
                _ => csv::read_csv(&source.read_bytes()?)?,
            }
        }
    };

    info!(rows = batch.num_rows(), columns = batch.num_columns(), "loaded table");
    Ok(RawTable::new(batch))
}

/// Serialize `table` as a single-sheet workbook named `sheet`.
///
/// Failures are logged and yield an empty buffer so the computed plot data
/// stays usable.
pub fn export_table(table: &arrow::record_batch::RecordBatch, sheet: &str) -> Vec<u8> {
    let result = csv::write_csv(table).and_then(|bytes| {
        workbook::write_workbook(sheet, &bytes)
            .map_err(|e| MettoolError::load(format!("writing workbook: {e}")))
    });
    match result {
        Ok(buf) => {
            debug!(sheet, bytes = buf.len(), "exported table");
            buf
        }
        Err(e) => {
            error!(sheet, error = %e, "export failed");
            Vec::new()
        }
    }
}
