use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

use crate::condition::ROW_IDX;

/// Failures raised by a physical backend (file or network).
///
/// The table engine never retries or compensates these; they reach the caller unchanged.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },

    #[error("malformed cell payload: {0}")]
    Payload(String),

    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("{} already exists, set overwrite to replace it", .0.display())]
    FileExists(PathBuf),

    #[error("no workbook found at {}", .0.display())]
    WorkbookNotFound(PathBuf),
}

impl IoError {
    pub fn from_backend(backend: &str, err: impl Display) -> Self {
        IoError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("missing value for column '{column}'")]
    MissingValue { column: String },

    #[error("row index required: pass '{}' in data or give a where clause", ROW_IDX)]
    RowIndexRequired,

    #[error("invalid row index '{value}'")]
    InvalidRowIndex { value: String },

    #[error("unexpected format attribute '{attribute}', expecting one of {expected:?}")]
    UnknownFormatAttribute {
        attribute: String,
        expected: &'static [&'static str],
    },

    #[error("invalid value for format attribute '{attribute}': {message}")]
    InvalidFormatValue { attribute: String, message: String },

    #[error("unexpected attribute '{attribute}' on {backend} cell")]
    UnknownCellAttribute {
        attribute: String,
        backend: &'static str,
    },

    #[error("cannot assign cell attribute '{attribute}': {message}")]
    InvalidCellAttribute { attribute: String, message: String },

    #[error("trying to create worksheet '{0}' without schema")]
    SchemaNotRegistered(String),

    #[error("worksheet '{0}' is not open")]
    UnknownWorksheet(String),

    #[error(transparent)]
    Io(#[from] IoError),
}
