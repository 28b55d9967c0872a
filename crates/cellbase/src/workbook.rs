//! Workbook-level registry: schemas, worksheet creation and per-worksheet tables.

use crate::backends::LocalWorkbook;
use crate::cell::Cell;
use crate::condition::Where;
use crate::config::CellbaseConfig;
use crate::error::{IoError, TableError};
use crate::format::FormatRequest;
use crate::table::{Row, Table};
use crate::traits::{TableBackend, WorkbookBackend};
use std::collections::BTreeMap;
use std::path::Path;

type FormatterOf<W> = <<W as WorkbookBackend>::Sheet as TableBackend>::Formatter;

/// A workbook whose worksheets are tables.
///
/// Data operations name a worksheet; a worksheet that does not exist yet is
/// created from its registered schema on first use.
///
/// ```
/// use cellbase::{Cellbase, LocalWorkbook, Row, Where};
///
/// let mut db = Cellbase::new(LocalWorkbook::new()).unwrap();
/// db.register("people", ["id", "name"]);
///
/// let mut row = Row::new();
/// row.insert("id".into(), 1.into());
/// row.insert("name".into(), "ada".into());
/// assert_eq!(db.insert("people", &row).unwrap(), 2);
///
/// let found = db.query("people", Some(&Where::new().eq("name", "ada"))).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
pub struct Cellbase<W: WorkbookBackend> {
    backend: W,
    config: CellbaseConfig,
    schemas: BTreeMap<String, Vec<String>>,
    tables: BTreeMap<String, Table<W::Sheet>>,
}

impl<W: WorkbookBackend> Cellbase<W> {
    pub fn new(backend: W) -> Result<Self, TableError> {
        Self::with_config(backend, CellbaseConfig::default())
    }

    /// Open every existing worksheet as a table and register the configured schemas.
    pub fn with_config(mut backend: W, config: CellbaseConfig) -> Result<Self, TableError> {
        let mut tables = BTreeMap::new();
        for name in backend.sheet_names()? {
            let sheet = backend.open_sheet(&name)?;
            let table = if backend.lazy() {
                Table::deferred(sheet)
            } else {
                Table::open(sheet)?
            };
            tables.insert(name, table);
        }
        let schemas = config.schemas.clone();
        Ok(Self {
            backend,
            config,
            schemas,
            tables,
        })
    }

    pub fn config(&self) -> &CellbaseConfig {
        &self.config
    }

    pub fn backend(&self) -> &W {
        &self.backend
    }

    /// Register the column schema used to create worksheet `name`.
    pub fn register<I, S>(&mut self, name: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
    }

    pub fn register_all<I, N, C, S>(&mut self, schemas: I)
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (name, columns) in schemas {
            self.register(name, columns);
        }
    }

    pub fn schema(&self, name: &str) -> Option<&[String]> {
        self.schemas.get(name).map(Vec::as_slice)
    }

    /// The table for `name`, creating the worksheet from its schema if needed.
    pub fn create_if_none(&mut self, name: &str) -> Result<&mut Table<W::Sheet>, TableError> {
        if !self.tables.contains_key(name) {
            let columns = self
                .schemas
                .get(name)
                .ok_or_else(|| TableError::SchemaNotRegistered(name.to_string()))?;
            let sheet = self.backend.create_sheet(name, columns)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(worksheet = name, columns = columns.len(), "worksheet created");

            let table = if self.backend.lazy() {
                Table::deferred(sheet)
            } else {
                Table::open(sheet)?
            };
            self.tables.insert(name.to_string(), table);
        }
        self.tables
            .get_mut(name)
            .ok_or_else(|| TableError::UnknownWorksheet(name.to_string()))
    }

    /// Indexed access; creates the worksheet like every data operation.
    pub fn table(&mut self, name: &str) -> Result<&mut Table<W::Sheet>, TableError> {
        self.create_if_none(name)
    }

    pub fn query(&mut self, name: &str, clause: Option<&Where>) -> Result<Vec<Row>, TableError> {
        self.create_if_none(name)?.query(clause)
    }

    pub fn insert(&mut self, name: &str, data: &Row) -> Result<u32, TableError> {
        self.create_if_none(name)?.insert(data)
    }

    pub fn update(
        &mut self,
        name: &str,
        data: &Row,
        clause: Option<&Where>,
    ) -> Result<usize, TableError> {
        self.create_if_none(name)?.update(data, clause)
    }

    pub fn delete(&mut self, name: &str, clause: Option<&Where>) -> Result<usize, TableError> {
        self.create_if_none(name)?.delete(clause)
    }

    pub fn traverse<F>(
        &mut self,
        name: &str,
        f: F,
        clause: Option<&Where>,
        select: Option<&[&str]>,
    ) -> Result<usize, TableError>
    where
        F: FnMut(&mut Cell),
    {
        self.create_if_none(name)?.traverse(f, clause, select)
    }

    pub fn format(
        &mut self,
        name: &str,
        request: impl Into<FormatRequest<FormatterOf<W>>>,
        clause: Option<&Where>,
        select: Option<&[&str]>,
    ) -> Result<usize, TableError> {
        self.create_if_none(name)?.format(request, clause, select)
    }

    /// Delete worksheet `name` and its table.
    pub fn drop(&mut self, name: &str) -> Result<(), TableError> {
        self.backend.drop_sheet(name)?;
        self.tables.remove(name);

        #[cfg(feature = "tracing")]
        tracing::debug!(worksheet = name, "worksheet dropped");

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of open tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

impl Cellbase<LocalWorkbook> {
    /// Load the workbook named by `config` and open it.
    pub fn open(config: CellbaseConfig) -> Result<Self, TableError> {
        let workbook = LocalWorkbook::load(&config)?;
        Self::with_config(workbook, config)
    }

    /// Save to the workbook's own path.
    pub fn save(&self) -> Result<(), TableError> {
        Ok(self.backend.save()?)
    }

    /// Save to `path`. An existing file is only replaced when `overwrite` is set.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P, overwrite: bool) -> Result<(), TableError> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            return Err(IoError::FileExists(path.to_path_buf()).into());
        }
        self.backend.save_to(path)?;
        Ok(())
    }
}
