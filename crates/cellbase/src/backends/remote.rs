use crate::cell::{Cell, CellAccessors, REMOTE_ACCESSORS};
use crate::error::IoError;
use crate::format::RemoteFormatter;
use crate::table::Compaction;
use crate::traits::{
    RemoteSpreadsheet, RemoteWorksheet, SheetSnapshot, TableBackend, WorkbookBackend,
};
use cellbase_common::CellValue;
use rustc_hash::FxHashSet;
use serde_json::Value as JsonValue;

/// Table backend over a remote worksheet.
///
/// Every table operation costs one round trip for its write: an insert is a
/// single `update_cells` batch into a slack row or an `insert_rows` (plus the
/// read-back), a delete or traversal is a single `update_cells` batch.
#[derive(Debug)]
pub struct RemoteSheet<W: RemoteWorksheet> {
    worksheet: W,
}

impl<W: RemoteWorksheet> RemoteSheet<W> {
    pub fn new(worksheet: W) -> Self {
        Self { worksheet }
    }

    pub fn worksheet(&self) -> &W {
        &self.worksheet
    }

    fn send(&mut self, cells: impl Iterator<Item = Cell>) -> Result<(), IoError> {
        let batch = cells
            .map(|cell| cell.to_payload())
            .collect::<Result<Vec<JsonValue>, _>>()?;
        if batch.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            worksheet = %self.worksheet.title(),
            cells = batch.len(),
            "update_cells batch"
        );

        self.worksheet.update_cells(batch)
    }
}

impl<W: RemoteWorksheet> TableBackend for RemoteSheet<W> {
    type Formatter = RemoteFormatter;

    fn name(&self) -> &str {
        self.worksheet.title()
    }

    fn accessors(&self) -> &'static CellAccessors {
        &REMOTE_ACCESSORS
    }

    fn fetch(&mut self) -> Result<SheetSnapshot, IoError> {
        let mut grid = self.worksheet.get_all_values()?.into_iter();
        Ok(SheetSnapshot {
            header: grid.next().unwrap_or_default(),
            rows: grid.collect(),
        })
    }

    /// Writes the schema cells into an existing slack row when the grid already
    /// extends past the data, leaving other columns of that row alone. Otherwise
    /// inserts a new row after the last one.
    fn insert_row(&mut self, row: u32, values: &[(u32, CellValue)]) -> Result<Vec<Cell>, IoError> {
        if self.worksheet.row_count() >= row {
            self.send(
                values
                    .iter()
                    .map(|(col, value)| Cell::new(&REMOTE_ACCESSORS, row, *col, value.clone())),
            )?;
        } else {
            let width = values.iter().map(|(col, _)| *col).max().unwrap_or(0);
            let mut positional = vec![CellValue::Empty; width as usize];
            for (col, value) in values {
                if let Some(slot) = positional.get_mut(col.saturating_sub(1) as usize) {
                    *slot = value.clone();
                }
            }
            self.worksheet.insert_rows(row - 1, vec![positional])?;
        }

        let wanted: FxHashSet<u32> = values.iter().map(|(col, _)| *col).collect();
        Ok(self
            .worksheet
            .get_row(row)?
            .into_iter()
            .filter(|cell| wanted.contains(&cell.column()))
            .collect())
    }

    fn commit_delete(&mut self, plan: &Compaction) -> Result<(), IoError> {
        self.send(plan.shifted.iter().chain(&plan.popped).cloned())
    }

    fn commit_cells(&mut self, cells: &[Cell]) -> Result<(), IoError> {
        self.send(cells.iter().cloned())
    }
}

/// Workbook backend over a remote spreadsheet. Tables open unfetched.
#[derive(Debug)]
pub struct RemoteWorkbook<S: RemoteSpreadsheet> {
    spreadsheet: S,
}

impl<S: RemoteSpreadsheet> RemoteWorkbook<S> {
    pub fn new(spreadsheet: S) -> Self {
        Self { spreadsheet }
    }

    pub fn spreadsheet(&self) -> &S {
        &self.spreadsheet
    }
}

impl<S: RemoteSpreadsheet> WorkbookBackend for RemoteWorkbook<S> {
    type Sheet = RemoteSheet<S::Worksheet>;

    fn sheet_names(&self) -> Result<Vec<String>, IoError> {
        self.spreadsheet.worksheet_titles()
    }

    fn open_sheet(&mut self, name: &str) -> Result<Self::Sheet, IoError> {
        Ok(RemoteSheet::new(self.spreadsheet.worksheet(name)?))
    }

    fn create_sheet(&mut self, name: &str, header: &[String]) -> Result<Self::Sheet, IoError> {
        let mut worksheet = self.spreadsheet.add_worksheet(name, 0)?;
        let header = header.iter().map(|h| CellValue::from(h.as_str())).collect();
        worksheet.update_row(1, header)?;
        Ok(RemoteSheet::new(worksheet))
    }

    fn drop_sheet(&mut self, name: &str) -> Result<(), IoError> {
        self.spreadsheet.del_worksheet(name)
    }

    fn lazy(&self) -> bool {
        true
    }
}
