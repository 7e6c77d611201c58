// ⚠️ Error Types - Storage, import source and per-row failures
//
// Only StorageError is fatal (startup must not serve lookups without a
// readable record file). Import failures are logged and skipped, malformed
// rows are recovered locally, and NotFound is a typed lookup result.

use std::path::PathBuf;
use thiserror::Error;

/// Record file failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read record file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record file {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write record file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Spreadsheet present but not usable. Never fatal.
#[derive(Error, Debug)]
pub enum ImportSourceError {
    #[error("unsupported spreadsheet format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to open spreadsheet {}: {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("spreadsheet {} has no sheets", path.display())]
    NoSheet { path: PathBuf },
}

/// Anything that stops an import merge from completing
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Source(#[from] ImportSourceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Why a single spreadsheet row was skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRow {
    #[error("row {row}: missing column {column}")]
    MissingColumn { row: usize, column: usize },

    #[error("row {row}: column {column} is not text")]
    NotText { row: usize, column: usize },

    #[error("row {row}: blank {field}")]
    BlankField { row: usize, field: &'static str },
}
