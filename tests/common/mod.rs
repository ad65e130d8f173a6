#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Five-row bank statement with one unparseable date, one unparseable amount,
/// spreadsheet serial value dates and a column that is entirely empty.
pub const BANK_STATEMENT: &str = "\
Booking Date,Value Date,Description,Amount,Currency,Unused
2023-01-05,45000,Coffee shop,(4.50),EUR,
2023-02-10,45010,Salary,$2.3M,EUR,
2023-03-15,45020,Rent,\"(1,234.50)\",USD,
not a date,45030,Refund,abc,USD,
2022-12-31,45040,Fees,15k,EUR,
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes [`BANK_STATEMENT`] as `bank.csv`.
    pub fn bank_statement(&self) -> PathBuf {
        self.write("bank.csv", BANK_STATEMENT)
    }
}

pub fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

pub fn present(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}
