use crate::cell::{Cell, CellAccessors, LOCAL_ACCESSORS};
use crate::config::CellbaseConfig;
use crate::error::IoError;
use crate::format::LocalFormatter;
use crate::style::CellStyle;
use crate::table::Compaction;
use crate::traits::{SheetSnapshot, TableBackend, WorkbookBackend};
use cellbase_common::CellValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    sheets: Vec<JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonSheet {
    title: String,
    #[serde(default)]
    cells: Vec<JsonCell>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    row: u32,
    col: u32,
    #[serde(default)]
    value: CellValue,
    #[serde(default, skip_serializing_if = "CellStyle::is_empty")]
    style: CellStyle,
}

#[derive(Debug, Default)]
struct LocalSheetData {
    cells: BTreeMap<(u32, u32), Cell>,
}

/// Handle to one worksheet of a [`LocalWorkbook`].
///
/// Clones share storage with the workbook, so a table driving a handle mutates
/// what the workbook saves.
#[derive(Clone, Debug)]
pub struct LocalSheet {
    title: String,
    data: Arc<RwLock<LocalSheetData>>,
}

impl LocalSheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: Arc::new(RwLock::new(LocalSheetData::default())),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Highest row holding a stored cell, 0 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.data
            .read()
            .cells
            .keys()
            .map(|(row, _)| *row)
            .max()
            .unwrap_or(0)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<Cell> {
        self.data.read().cells.get(&(row, col)).cloned()
    }

    /// Store `cell` at its coordinate. A blank, unstyled cell clears the position.
    pub fn write_cell(&self, cell: Cell) {
        let mut data = self.data.write();
        Self::put(&mut data, cell);
    }

    fn put(data: &mut LocalSheetData, cell: Cell) {
        let key = (cell.row(), cell.column());
        if cell.value().is_empty() && cell.style().is_empty() {
            data.cells.remove(&key);
        } else {
            data.cells.insert(key, cell);
        }
    }

    fn row_cells(data: &LocalSheetData, row: u32) -> Vec<Cell> {
        data.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|(_, cell)| cell.clone())
            .collect()
    }

    fn to_json(&self) -> JsonSheet {
        let data = self.data.read();
        JsonSheet {
            title: self.title.clone(),
            cells: data
                .cells
                .values()
                .map(|cell| JsonCell {
                    row: cell.row(),
                    col: cell.column(),
                    value: cell.value().clone(),
                    style: cell.style().clone(),
                })
                .collect(),
        }
    }

    fn from_json(sheet: JsonSheet) -> Result<Self, IoError> {
        let handle = Self::new(sheet.title);
        {
            let mut data = handle.data.write();
            for cell in sheet.cells {
                if cell.row == 0 || cell.col == 0 {
                    return Err(IoError::Payload(format!(
                        "cell at ({}, {}) in '{}' is not 1-based",
                        cell.row, cell.col, handle.title
                    )));
                }
                let mut stored = Cell::new(&LOCAL_ACCESSORS, cell.row, cell.col, cell.value);
                *stored.style_mut() = cell.style;
                Self::put(&mut data, stored);
            }
        }
        Ok(handle)
    }
}

impl TableBackend for LocalSheet {
    type Formatter = LocalFormatter;

    fn name(&self) -> &str {
        &self.title
    }

    fn accessors(&self) -> &'static CellAccessors {
        &LOCAL_ACCESSORS
    }

    fn fetch(&mut self) -> Result<SheetSnapshot, IoError> {
        let data = self.data.read();
        let max_row = data.cells.keys().map(|(row, _)| *row).max().unwrap_or(0);
        Ok(SheetSnapshot {
            header: Self::row_cells(&data, 1),
            rows: (2..=max_row)
                .map(|row| Self::row_cells(&data, row))
                .collect(),
        })
    }

    fn insert_row(&mut self, row: u32, values: &[(u32, CellValue)]) -> Result<Vec<Cell>, IoError> {
        let mut data = self.data.write();
        let cells: Vec<Cell> = values
            .iter()
            .map(|(col, value)| Cell::new(&LOCAL_ACCESSORS, row, *col, value.clone()))
            .collect();
        for cell in &cells {
            Self::put(&mut data, cell.clone());
        }
        Ok(cells)
    }

    fn commit_delete(&mut self, plan: &Compaction) -> Result<(), IoError> {
        let mut data = self.data.write();
        for cell in &plan.shifted {
            Self::put(&mut data, cell.clone());
        }
        for cell in &plan.popped {
            data.cells.remove(&(cell.row(), cell.column()));
        }
        Ok(())
    }

    fn commit_cells(&mut self, cells: &[Cell]) -> Result<(), IoError> {
        let mut data = self.data.write();
        for cell in cells {
            Self::put(&mut data, cell.clone());
        }
        Ok(())
    }
}

/// In-memory workbook persisted as a JSON document.
#[derive(Debug, Default)]
pub struct LocalWorkbook {
    path: Option<PathBuf>,
    sheets: Vec<LocalSheet>,
}

impl LocalWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let file = File::open(path.as_ref())?;
        let data: JsonWorkbook = serde_json::from_reader(BufReader::new(file))?;
        let mut workbook = Self::from_data(data)?;
        workbook.path = Some(path.as_ref().to_path_buf());
        Ok(workbook)
    }

    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        Self::from_data(serde_json::from_str(json)?)
    }

    /// Open the workbook at `config.location()`, or start an empty one bound to
    /// that path when the file is missing and `create_if_missing` is set.
    pub fn load(config: &CellbaseConfig) -> Result<Self, IoError> {
        let location = config.location();
        if location.exists() {
            Self::open_path(location)
        } else if config.create_if_missing {
            Ok(Self {
                path: Some(location),
                sheets: Vec::new(),
            })
        } else {
            Err(IoError::WorkbookNotFound(location))
        }
    }

    fn from_data(data: JsonWorkbook) -> Result<Self, IoError> {
        let sheets = data
            .sheets
            .into_iter()
            .map(LocalSheet::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { path: None, sheets })
    }

    fn to_data(&self) -> JsonWorkbook {
        JsonWorkbook {
            version: default_version(),
            sheets: self.sheets.iter().map(LocalSheet::to_json).collect(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sheet(&self, name: &str) -> Option<&LocalSheet> {
        self.sheets.iter().find(|sheet| sheet.title == name)
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    /// Write to the bound path. A workbook without a path has nowhere to go and
    /// saving it does nothing.
    pub fn save(&self) -> Result<(), IoError> {
        match &self.path {
            Some(path) => self.write_to(path),
            None => Ok(()),
        }
    }

    /// Write to `path` and bind the workbook to it.
    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        self.write_to(path.as_ref())?;
        self.path = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), IoError> {
        let mut file = File::create(path)?;
        let s = self.to_json_string()?;
        file.write_all(s.as_bytes())?;
        Ok(())
    }
}

impl WorkbookBackend for LocalWorkbook {
    type Sheet = LocalSheet;

    fn sheet_names(&self) -> Result<Vec<String>, IoError> {
        Ok(self.sheets.iter().map(|sheet| sheet.title.clone()).collect())
    }

    fn open_sheet(&mut self, name: &str) -> Result<LocalSheet, IoError> {
        self.sheet(name)
            .cloned()
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))
    }

    fn create_sheet(&mut self, name: &str, header: &[String]) -> Result<LocalSheet, IoError> {
        if self.sheet(name).is_some() {
            return Err(IoError::from_backend(
                LOCAL_ACCESSORS.backend,
                format!("worksheet '{name}' already exists"),
            ));
        }
        let sheet = LocalSheet::new(name);
        for (i, column) in header.iter().enumerate() {
            sheet.write_cell(Cell::new(
                &LOCAL_ACCESSORS,
                1,
                i as u32 + 1,
                column.as_str(),
            ));
        }
        self.sheets.insert(0, sheet.clone());
        Ok(sheet)
    }

    fn drop_sheet(&mut self, name: &str) -> Result<(), IoError> {
        let position = self
            .sheets
            .iter()
            .position(|sheet| sheet.title == name)
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))?;
        self.sheets.remove(position);
        Ok(())
    }
}
