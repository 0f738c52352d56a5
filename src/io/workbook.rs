// A workbook is a zip archive whose `.csv` entries are its sheets, named by
// file stem and listed in archive order.

use std::{
    io::{Cursor, Read, Seek, Write},
    path::Path,
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{MettoolError, Result};

fn sheet_name(entry_name: &str) -> Option<String> {
    let path = Path::new(entry_name);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Sheet names in archive order.
pub fn sheet_names<R: Read + Seek>(reader: R) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| MettoolError::load(format!("reading workbook archive: {e}")))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| MettoolError::load(format!("accessing workbook entry #{i}: {e}")))?;
        if entry.is_file() {
            if let Some(name) = sheet_name(entry.name()) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Raw CSV bytes of one sheet.
pub fn read_sheet<R: Read + Seek>(reader: R, sheet: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| MettoolError::load(format!("reading workbook archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| MettoolError::load(format!("accessing workbook entry #{i}: {e}")))?;
        if !entry.is_file() || sheet_name(entry.name()).as_deref() != Some(sheet) {
            continue;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| MettoolError::load(format!("reading sheet {sheet}: {e}")))?;
        return Ok(buf);
    }

    Err(MettoolError::load(format!("sheet \"{sheet}\" not found")))
}

/// Wrap CSV bytes into a single-sheet workbook.
pub fn write_workbook(sheet: &str, csv: &[u8]) -> zip::result::ZipResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{sheet}.csv"), options)?;
        zip.write_all(csv)?;
        zip.finish()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn two_sheet_workbook() -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file("Input.csv", options.clone())?;
            zip.write_all(b"Date,Flow\n2023-01-01,1\n")?;
            zip.start_file("readme.txt", options.clone())?;
            zip.write_all(b"not a sheet")?;
            zip.start_file("nested/Other.CSV", options)?;
            zip.write_all(b"Date,Temp\n2023-01-01,5\n")?;
            zip.finish()?;
        }
        Ok(buf)
    }

    #[test]
    fn lists_csv_entries_in_order() -> Result<()> {
        let wb = two_sheet_workbook()?;
        assert_eq!(sheet_names(Cursor::new(&wb))?, vec!["Input", "Other"]);
        Ok(())
    }

    #[test]
    fn reads_a_named_sheet() -> Result<()> {
        let wb = two_sheet_workbook()?;
        let bytes = read_sheet(Cursor::new(&wb), "Other")?;
        assert_eq!(bytes, b"Date,Temp\n2023-01-01,5\n");
        assert!(matches!(
            read_sheet(Cursor::new(&wb), "Missing"),
            Err(MettoolError::LoadFailure { .. })
        ));
        Ok(())
    }

    #[test]
    fn written_workbook_reads_back() -> Result<()> {
        let wb = write_workbook("Control", b"a,b\n1,2\n")?;
        assert_eq!(sheet_names(Cursor::new(&wb))?, vec!["Control"]);
        assert_eq!(read_sheet(Cursor::new(&wb), "Control")?, b"a,b\n1,2\n");
        Ok(())
    }

    #[test]
    fn garbage_is_a_load_failure() {
        assert!(matches!(
            sheet_names(Cursor::new(b"definitely not a zip".to_vec())),
            Err(MettoolError::LoadFailure { .. })
        ));
    }
}
