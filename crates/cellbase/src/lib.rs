//! Spreadsheet worksheets as lightweight tables.
//!
//! A [`Table`] indexes one worksheet by row and column and keeps row indices
//! equal to physical positions across inserts and deletes. The same engine
//! runs over a local JSON-persisted workbook ([`LocalWorkbook`]) and a remote
//! spreadsheet service ([`RemoteWorkbook`]), where writes are batched and the
//! first read is deferred until a table is used.

pub mod backends;
pub mod cell;
pub mod condition;
pub mod config;
pub mod error;
pub mod format;
pub mod style;
pub mod table;
pub mod traits;
pub mod workbook;

pub use backends::{
    CallLog, LocalSheet, LocalWorkbook, MemorySpreadsheet, MemoryWorksheet, RemoteSheet,
    RemoteWorkbook,
};
pub use cell::{
    Cell, CellAccessors, CellField, FieldValue, LOCAL_ACCESSORS, REMOTE_ACCESSORS,
};
pub use condition::{Condition, ROW_IDX, RowCondition, Where};
pub use config::CellbaseConfig;
pub use error::{IoError, TableError};
pub use format::{CellFormatter, FormatArg, FormatRequest, LocalFormatter, RemoteFormatter};
pub use table::{ColumnId, Compaction, Row, Table, TableIndex};
pub use traits::{RemoteSpreadsheet, RemoteWorksheet, SheetSnapshot, TableBackend, WorkbookBackend};
pub use workbook::Cellbase;

// Re-export for convenience
pub use cellbase_common::{CellCoord, CellValue};
