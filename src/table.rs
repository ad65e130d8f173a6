//! Raw tables as handed over by the loading layer.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::io_utils;

/// A single source cell. `None` means the cell was absent or blank, which is
/// distinct from text that later fails to parse.
pub type RawCell = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub cells: Vec<RawCell>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, cells: Vec<RawCell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<RawColumn>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<RawColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Reads a headed CSV file (or stdin for `-`) into a table named after the
    /// file stem. Blank fields become missing cells and short rows are padded.
    pub fn from_csv_path(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let mut columns: Vec<RawColumn> = headers
            .iter()
            .map(|name| RawColumn::new(name.trim(), Vec::new()))
            .collect();

        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            if decoded.len() > columns.len() {
                debug!(
                    "Row {} has {} field(s) for {} column(s); extra fields dropped",
                    row_idx + 2,
                    decoded.len(),
                    columns.len()
                );
            }
            for (idx, column) in columns.iter_mut().enumerate() {
                let cell = decoded
                    .get(idx)
                    .map(|value| value.trim())
                    .filter(|value| !value.is_empty())
                    .map(str::to_string);
                column.cells.push(cell);
            }
        }

        let name = if io_utils::is_dash(path) {
            "stdin".to_string()
        } else {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("table")
                .to_string()
        };
        let table = Table::new(name, columns);
        debug!(
            "Loaded table '{}' with shape {:?}",
            table.name,
            table.shape()
        );
        Ok(table)
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        let rows = self.columns.first().map_or(0, |c| c.cells.len());
        (rows, self.columns.len())
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Removes every column with no present cell. Returns the dropped names.
    pub fn drop_all_null_columns(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|column| {
            if column.is_all_missing() {
                dropped.push(column.name.clone());
                false
            } else {
                true
            }
        });
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_all_null_columns_keeps_partially_filled() {
        let mut table = Table::new(
            "ledger",
            vec![
                RawColumn::new("Amount", vec![Some("1".into()), None]),
                RawColumn::new("Unused", vec![None, None]),
                RawColumn::new("Memo", vec![None, Some("x".into())]),
            ],
        );
        let dropped = table.drop_all_null_columns();
        assert_eq!(dropped, vec!["Unused".to_string()]);
        assert_eq!(table.column_names(), vec!["Amount", "Memo"]);
        assert_eq!(table.shape(), (2, 2));
    }

    #[test]
    fn extra_fields_are_dropped_and_short_rows_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "Date,Amount\n2024-01-02,10,overflow\n2024-01-03\n").unwrap();

        let table = Table::from_csv_path(&path, b',', encoding_rs::UTF_8).unwrap();
        assert_eq!(table.name, "ragged");
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(
            table.column("Amount").unwrap().cells,
            vec![Some("10".to_string()), None]
        );
    }

    #[test]
    fn empty_table_has_zero_shape() {
        let table = Table::new("empty", Vec::new());
        assert_eq!(table.shape(), (0, 0));
        assert!(table.column("missing").is_none());
    }
}
