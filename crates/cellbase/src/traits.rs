use crate::cell::{Cell, CellAccessors};
use crate::error::IoError;
use crate::format::CellFormatter;
use crate::table::Compaction;
use cellbase_common::CellValue;
use serde_json::Value as JsonValue;

/// Full read of a worksheet: the header row and every content row from row 2 on.
///
/// `rows[i]` holds the cells of physical row `i + 2`. Rows may be ragged; missing
/// positions read as blank.
#[derive(Clone, Debug, Default)]
pub struct SheetSnapshot {
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

/// Physical mutation primitives a table drives for one worksheet.
///
/// Every method maps to the smallest set of writes the backend can perform; the
/// table computes *what* changes and the backend decides *how* to store it.
pub trait TableBackend {
    type Formatter: CellFormatter;

    /// Worksheet title.
    fn name(&self) -> &str;

    fn accessors(&self) -> &'static CellAccessors;

    /// Read the whole worksheet.
    fn fetch(&mut self) -> Result<SheetSnapshot, IoError>;

    /// Write one row at `row`, given as `(physical column, value)` pairs in schema order.
    /// Returns the cells as stored, one per pair.
    fn insert_row(&mut self, row: u32, values: &[(u32, CellValue)]) -> Result<Vec<Cell>, IoError>;

    /// Apply a delete compaction: move shifted cells into place and clear popped slots.
    fn commit_delete(&mut self, plan: &Compaction) -> Result<(), IoError>;

    /// Write back cells touched by a traversal.
    fn commit_cells(&mut self, cells: &[Cell]) -> Result<(), IoError>;
}

/// A workbook whose worksheets can be opened as tables.
pub trait WorkbookBackend {
    type Sheet: TableBackend;

    fn sheet_names(&self) -> Result<Vec<String>, IoError>;

    fn open_sheet(&mut self, name: &str) -> Result<Self::Sheet, IoError>;

    /// Create a worksheet at the front of the workbook with `header` as row 1.
    fn create_sheet(&mut self, name: &str, header: &[String]) -> Result<Self::Sheet, IoError>;

    fn drop_sheet(&mut self, name: &str) -> Result<(), IoError>;

    /// Tables over this backend defer their first read until used.
    fn lazy(&self) -> bool {
        false
    }
}

/// Worksheet API of a network spreadsheet service.
///
/// Each method is one round trip except [`RemoteWorksheet::title`] and
/// [`RemoteWorksheet::row_count`], which read cached sheet metadata.
pub trait RemoteWorksheet {
    fn title(&self) -> &str;

    /// Physical row extent of the worksheet, which may exceed the rows holding data.
    fn row_count(&self) -> u32;

    /// Every row up to the last non-empty one, header included.
    fn get_all_values(&self) -> Result<Vec<Vec<Cell>>, IoError>;

    /// Insert `rows` after physical row `after`, shifting later rows down.
    fn insert_rows(&mut self, after: u32, rows: Vec<Vec<CellValue>>) -> Result<(), IoError>;

    /// Overwrite row `index` starting at column 1.
    fn update_row(&mut self, index: u32, values: Vec<CellValue>) -> Result<(), IoError>;

    fn get_row(&self, index: u32) -> Result<Vec<Cell>, IoError>;

    /// Batched cell write. Each payload is a cell serialized with [`Cell::to_payload`].
    fn update_cells(&mut self, batch: Vec<JsonValue>) -> Result<(), IoError>;
}

/// Spreadsheet-level API of a network spreadsheet service.
pub trait RemoteSpreadsheet {
    type Worksheet: RemoteWorksheet;

    fn worksheet_titles(&self) -> Result<Vec<String>, IoError>;

    fn worksheet(&self, title: &str) -> Result<Self::Worksheet, IoError>;

    fn add_worksheet(&mut self, title: &str, index: usize) -> Result<Self::Worksheet, IoError>;

    fn del_worksheet(&mut self, title: &str) -> Result<(), IoError>;
}
