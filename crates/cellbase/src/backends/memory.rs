//! In-process implementation of the remote spreadsheet API.
//!
//! Behaves like a hosted spreadsheet service: worksheets have a physical grid
//! extent larger than their data, writes past the extent fail, and every API
//! method is counted in a [`CallLog`] so round-trip budgets can be checked.

use crate::cell::{Cell, REMOTE_ACCESSORS};
use crate::error::IoError;
use crate::traits::{RemoteSpreadsheet, RemoteWorksheet};
use cellbase_common::{CellCoord, CellValue};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

const BACKEND: &str = "memory";

/// Rows a new worksheet gets unless configured otherwise.
pub const DEFAULT_ROWS: u32 = 1000;
/// Columns a new worksheet gets unless configured otherwise.
pub const DEFAULT_COLUMNS: u32 = 26;

/// Number of calls made per API method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallLog {
    counts: BTreeMap<&'static str, usize>,
}

impl CallLog {
    pub fn count(&self, method: &str) -> usize {
        self.counts.get(method).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn record(&mut self, method: &'static str) {
        *self.counts.entry(method).or_default() += 1;
    }
}

#[derive(Debug)]
struct WorksheetData {
    title: String,
    row_count: u32,
    col_count: u32,
    cells: BTreeMap<(u32, u32), Cell>,
}

impl WorksheetData {
    fn check_bounds(&self, row: u32, col: u32) -> Result<(), IoError> {
        let coord = CellCoord::new(row, col)
            .map_err(|e| IoError::from_backend(BACKEND, format!("({row}, {col}): {e}")))?;
        if row > self.row_count || col > self.col_count {
            return Err(IoError::from_backend(
                BACKEND,
                format!(
                    "{coord} exceeds grid limits of '{}' ({} x {})",
                    self.title, self.row_count, self.col_count
                ),
            ));
        }
        Ok(())
    }

    fn put(&mut self, cell: Cell) {
        let key = (cell.row(), cell.column());
        if cell.value().is_empty() && cell.style().is_empty() {
            self.cells.remove(&key);
        } else {
            self.cells.insert(key, cell);
        }
    }

    fn max_col(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.value().is_empty())
            .map(|((_, col), _)| *col)
            .max()
            .unwrap_or(0)
    }

    fn row(&self, row: u32, width: u32) -> Vec<Cell> {
        (1..=width)
            .map(|col| {
                self.cells
                    .get(&(row, col))
                    .cloned()
                    .unwrap_or_else(|| Cell::blank(&REMOTE_ACCESSORS, row, col))
            })
            .collect()
    }
}

#[derive(Debug)]
struct SpreadsheetData {
    worksheets: Vec<WorksheetData>,
    calls: CallLog,
    default_rows: u32,
    default_columns: u32,
}

impl SpreadsheetData {
    fn sheet(&self, title: &str) -> Result<&WorksheetData, IoError> {
        self.worksheets
            .iter()
            .find(|ws| ws.title == title)
            .ok_or_else(|| IoError::SheetNotFound(title.to_string()))
    }

    fn sheet_mut(&mut self, title: &str) -> Result<&mut WorksheetData, IoError> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.title == title)
            .ok_or_else(|| IoError::SheetNotFound(title.to_string()))
    }
}

/// Shared handle to an in-process spreadsheet. Clones observe the same state.
#[derive(Clone, Debug)]
pub struct MemorySpreadsheet {
    state: Arc<Mutex<SpreadsheetData>>,
}

impl Default for MemorySpreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySpreadsheet {
    pub fn new() -> Self {
        Self::with_default_size(DEFAULT_ROWS, DEFAULT_COLUMNS)
    }

    /// New worksheets get `rows` x `columns` cells of grid.
    pub fn with_default_size(rows: u32, columns: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SpreadsheetData {
                worksheets: Vec::new(),
                calls: CallLog::default(),
                default_rows: rows.max(1),
                default_columns: columns.max(1),
            })),
        }
    }

    pub fn with_default_rows(rows: u32) -> Self {
        Self::with_default_size(rows, DEFAULT_COLUMNS)
    }

    pub fn calls(&self) -> CallLog {
        self.state.lock().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls = CallLog::default();
    }

    /// Stored value at a position, without counting a call.
    pub fn value(&self, title: &str, row: u32, col: u32) -> Option<CellValue> {
        let state = self.state.lock();
        let sheet = state.sheet(title).ok()?;
        Some(
            sheet
                .cells
                .get(&(row, col))
                .map(|cell| cell.value().clone())
                .unwrap_or_default(),
        )
    }

    /// Stored cell at a position, without counting a call.
    pub fn cell(&self, title: &str, row: u32, col: u32) -> Option<Cell> {
        let state = self.state.lock();
        state.sheet(title).ok()?.cells.get(&(row, col)).cloned()
    }

    /// Grid extent of a worksheet, without counting a call.
    pub fn grid_size(&self, title: &str) -> Option<(u32, u32)> {
        let state = self.state.lock();
        let sheet = state.sheet(title).ok()?;
        Some((sheet.row_count, sheet.col_count))
    }
}

impl RemoteSpreadsheet for MemorySpreadsheet {
    type Worksheet = MemoryWorksheet;

    fn worksheet_titles(&self) -> Result<Vec<String>, IoError> {
        let mut state = self.state.lock();
        state.calls.record("worksheet_titles");
        Ok(state.worksheets.iter().map(|ws| ws.title.clone()).collect())
    }

    fn worksheet(&self, title: &str) -> Result<MemoryWorksheet, IoError> {
        let mut state = self.state.lock();
        state.calls.record("worksheet");
        state.sheet(title)?;
        Ok(MemoryWorksheet {
            title: title.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn add_worksheet(&mut self, title: &str, index: usize) -> Result<MemoryWorksheet, IoError> {
        let mut state = self.state.lock();
        state.calls.record("add_worksheet");
        if state.sheet(title).is_ok() {
            return Err(IoError::from_backend(
                BACKEND,
                format!("a sheet with the name '{title}' already exists"),
            ));
        }
        let sheet = WorksheetData {
            title: title.to_string(),
            row_count: state.default_rows,
            col_count: state.default_columns,
            cells: BTreeMap::new(),
        };
        let index = index.min(state.worksheets.len());
        state.worksheets.insert(index, sheet);
        Ok(MemoryWorksheet {
            title: title.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn del_worksheet(&mut self, title: &str) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.calls.record("del_worksheet");
        let position = state
            .worksheets
            .iter()
            .position(|ws| ws.title == title)
            .ok_or_else(|| IoError::SheetNotFound(title.to_string()))?;
        state.worksheets.remove(position);
        Ok(())
    }
}

/// One worksheet of a [`MemorySpreadsheet`].
#[derive(Clone, Debug)]
pub struct MemoryWorksheet {
    title: String,
    state: Arc<Mutex<SpreadsheetData>>,
}

impl RemoteWorksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn row_count(&self) -> u32 {
        let state = self.state.lock();
        state.sheet(&self.title).map_or(0, |ws| ws.row_count)
    }

    fn get_all_values(&self) -> Result<Vec<Vec<Cell>>, IoError> {
        let mut state = self.state.lock();
        state.calls.record("get_all_values");
        let sheet = state.sheet(&self.title)?;
        let width = sheet.max_col();
        let height = sheet
            .cells
            .iter()
            .filter(|(_, cell)| !cell.value().is_empty())
            .map(|((row, _), _)| *row)
            .max()
            .unwrap_or(0);
        Ok((1..=height).map(|row| sheet.row(row, width)).collect())
    }

    fn insert_rows(&mut self, after: u32, rows: Vec<Vec<CellValue>>) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.calls.record("insert_rows");
        let sheet = state.sheet_mut(&self.title)?;
        if after > sheet.row_count {
            return Err(IoError::from_backend(
                BACKEND,
                format!("cannot insert after row {after} of {}", sheet.row_count),
            ));
        }

        let count = rows.len() as u32;
        let moved = sheet.cells.split_off(&(after + 1, 0));
        for ((row, col), mut cell) in moved {
            cell.set_row(row + count);
            sheet.cells.insert((row + count, col), cell);
        }
        sheet.row_count += count;

        for (offset, values) in rows.into_iter().enumerate() {
            let row = after + 1 + offset as u32;
            sheet.col_count = sheet.col_count.max(values.len() as u32);
            for (i, value) in values.into_iter().enumerate() {
                sheet.put(Cell::new(&REMOTE_ACCESSORS, row, i as u32 + 1, value));
            }
        }
        Ok(())
    }

    fn update_row(&mut self, index: u32, values: Vec<CellValue>) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.calls.record("update_row");
        let sheet = state.sheet_mut(&self.title)?;
        for (i, value) in values.into_iter().enumerate() {
            let col = i as u32 + 1;
            sheet.check_bounds(index, col)?;
            sheet.put(Cell::new(&REMOTE_ACCESSORS, index, col, value));
        }
        Ok(())
    }

    fn get_row(&self, index: u32) -> Result<Vec<Cell>, IoError> {
        let mut state = self.state.lock();
        state.calls.record("get_row");
        let sheet = state.sheet(&self.title)?;
        Ok(sheet.row(index, sheet.max_col()))
    }

    fn update_cells(&mut self, batch: Vec<JsonValue>) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.calls.record("update_cells");
        let sheet = state.sheet_mut(&self.title)?;
        let cells = batch
            .iter()
            .map(|payload| Cell::from_payload(&REMOTE_ACCESSORS, payload))
            .collect::<Result<Vec<_>, _>>()?;
        for cell in &cells {
            sheet.check_bounds(cell.row(), cell.column())?;
        }
        for cell in cells {
            sheet.put(cell);
        }
        Ok(())
    }
}
