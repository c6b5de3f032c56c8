//! Raw extract rows and the per-row view used by projection

use super::header::HeaderMap;
use import_types::Ordinal;
use std::io::Read;
use std::path::Path;

/// A delimited vendor extract, every physical line kept as cells
#[derive(Debug, Clone, Default)]
pub struct Extract {
    rows: Vec<Vec<String>>,
}

impl Extract {
    /// Read an extract from disk; open failures surface as `csv::Error`
    pub fn from_path(path: &Path) -> Result<Self, csv::Error> {
        Self::collect(extract_reader().from_path(path)?)
    }

    /// Read an extract from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        Self::collect(extract_reader().from_reader(reader))
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at a 1-based ordinal
    pub fn row(&self, ordinal: Ordinal) -> Option<&[String]> {
        ordinal
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
    }
}

/// Vendor files carry banner lines above the header and ragged rows, so
/// the reader takes no header and accepts variable-width records.
fn extract_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// One extract row addressed through the detected header mapping
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    pub ordinal: Ordinal,
    cells: &'a [String],
    headers: &'a HeaderMap,
}

impl<'a> SourceRow<'a> {
    pub fn new(ordinal: Ordinal, cells: &'a [String], headers: &'a HeaderMap) -> Self {
        Self {
            ordinal,
            cells,
            headers,
        }
    }

    /// Raw cell for a logical field; `None` when the column was not found
    /// in this extract or the row is short
    pub fn cell(&self, field: &str) -> Option<&'a str> {
        self.headers
            .index(field)
            .and_then(|idx| self.cells.get(idx))
            .map(String::as_str)
    }

    /// Trimmed cell value, blank when absent
    pub fn value(&self, field: &str) -> &'a str {
        self.cell(field).map(str::trim).unwrap_or("")
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    /// True when every found column of the row is blank
    pub fn is_blank(&self) -> bool {
        self.headers
            .found_indices()
            .all(|idx| self.cells.get(idx).map_or(true, |c| c.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_keeps_banner_and_ragged_rows() {
        let data = "Rent Roll Report\nUnit,Status\n101,occupied,extra\n";
        let extract = Extract::from_reader(data.as_bytes()).unwrap();
        assert_eq!(extract.len(), 3);
        assert_eq!(extract.row(1).unwrap(), ["Rent Roll Report"]);
        assert_eq!(extract.row(3).unwrap().len(), 3);
        assert!(extract.row(0).is_none());
        assert!(extract.row(4).is_none());
    }

    #[test]
    fn test_from_path_shares_csv_error_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rentroll.csv");
        std::fs::write(&path, "Unit,Status\n101,vacant\n").unwrap();
        assert_eq!(Extract::from_path(&path).unwrap().len(), 2);

        let err = Extract::from_path(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err.kind(), csv::ErrorKind::Io(_)));
        let err: crate::error::ImportError = err.into();
        assert!(matches!(err, crate::error::ImportError::Extract(_)));
    }
}
