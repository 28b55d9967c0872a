//! Table core: the row/column index over one worksheet and the operations that
//! keep it bound to physical positions.
//!
//! Row `n` of the index is physical row `n` of the worksheet. Row 1 holds the
//! header, data rows run contiguously from 2 to `size + 1`, and every public
//! operation restores that layout before returning. Backend writes happen first;
//! the index only changes once the backend has accepted them.

use crate::cell::{Cell, CellAccessors};
use crate::condition::{ROW_IDX, Where, row_index_of, rows_matching_all};
use crate::error::TableError;
use crate::format::{CellFormatter, FormatRequest};
use crate::traits::{SheetSnapshot, TableBackend};
use cellbase_common::CellValue;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// One row record: column name to value, plus the row index under [`ROW_IDX`].
pub type Row = BTreeMap<String, CellValue>;

/// A schema column: header text and its 1-based physical column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnId {
    pub name: String,
    pub index: u32,
}

/// Row and column index of a fetched worksheet.
#[derive(Clone, Debug)]
pub struct TableIndex {
    columns: Vec<ColumnId>,
    rows: BTreeMap<u32, BTreeMap<String, Cell>>,
    accessors: &'static CellAccessors,
}

impl TableIndex {
    /// Build the index from a full read.
    ///
    /// Columns come from the non-empty header cells, first occurrence winning.
    /// Trailing rows with every schema cell empty are physical slack, not data,
    /// and are left out.
    pub fn from_snapshot(accessors: &'static CellAccessors, snapshot: SheetSnapshot) -> Self {
        let mut seen = FxHashSet::default();
        let columns: Vec<ColumnId> = snapshot
            .header
            .iter()
            .filter(|cell| !cell.value().is_empty())
            .map(|cell| ColumnId {
                name: cell.value().to_string(),
                index: cell.column(),
            })
            .filter(|column| seen.insert(column.name.clone()))
            .collect();

        let mut index = Self {
            columns,
            rows: BTreeMap::new(),
            accessors,
        };
        for (offset, cells) in snapshot.rows.into_iter().enumerate() {
            index.register_row(offset as u32 + 2, cells);
        }
        while let Some((&last, cells)) = index.rows.last_key_value() {
            if !cells.values().all(|cell| cell.value().is_empty()) {
                break;
            }
            index.rows.remove(&last);
        }
        index
    }

    pub fn accessors(&self) -> &'static CellAccessors {
        self.accessors
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnId> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnId, TableError> {
        self.column(name).ok_or_else(|| TableError::UnknownColumn {
            column: name.to_string(),
        })
    }

    /// Number of data rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn last_row_index(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    pub fn contains_row(&self, row: u32) -> bool {
        self.rows.contains_key(&row)
    }

    pub fn row_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, &BTreeMap<String, Cell>)> {
        self.rows.iter().map(|(row, cells)| (*row, cells))
    }

    pub fn row_cells(&self, row: u32) -> Option<&BTreeMap<String, Cell>> {
        self.rows.get(&row)
    }

    pub fn cell(&self, row: u32, column: &str) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cells| cells.get(column))
    }

    pub fn record(&self, row: u32) -> Option<Row> {
        let cells = self.rows.get(&row)?;
        let mut record: Row = cells
            .iter()
            .map(|(name, cell)| (name.clone(), cell.value().clone()))
            .collect();
        record.insert(ROW_IDX.to_string(), CellValue::from(row));
        Some(record)
    }

    /// Row keys are exactly `2..=size + 1`.
    pub fn is_contiguous(&self) -> bool {
        self.rows.keys().copied().eq(2..=self.last_row_index())
    }

    /// Index the cells of `row`, filling schema columns the backend did not return
    /// with blanks.
    pub(crate) fn register_row(&mut self, row: u32, cells: Vec<Cell>) {
        let mut by_column: FxHashMap<u32, Cell> =
            cells.into_iter().map(|cell| (cell.column(), cell)).collect();
        let record = self
            .columns
            .iter()
            .map(|column| {
                let cell = match by_column.remove(&column.index) {
                    Some(mut cell) => {
                        cell.set_row(row);
                        cell
                    }
                    None => Cell::blank(self.accessors, row, column.index),
                };
                (column.name.clone(), cell)
            })
            .collect();
        self.rows.insert(row, record);
    }

    /// Replace the indexed cell at the same position.
    pub(crate) fn store(&mut self, cell: Cell) {
        let Some(column) = self.columns.iter().find(|c| c.index == cell.column()) else {
            return;
        };
        if let Some(cells) = self.rows.get_mut(&cell.row()) {
            cells.insert(column.name.clone(), cell);
        }
    }

    pub(crate) fn apply_compaction(&mut self, plan: &Compaction) {
        self.rows.retain(|row, _| *row < plan.first);
        for cell in &plan.shifted {
            let Some(column) = self.columns.iter().find(|c| c.index == cell.column()) else {
                continue;
            };
            self.rows
                .entry(cell.row())
                .or_default()
                .insert(column.name.clone(), cell.clone());
        }
        let kept = plan.last - plan.deleted as u32;
        for row in plan.first..=kept {
            self.rows.entry(row).or_default();
        }
    }
}

/// Physical writes that close the gaps left by a delete.
///
/// Over the affected range `first..=last`, each slot takes the next surviving
/// row at or after it (`shifted`, cells carrying their new row). Slots past the
/// last survivor are cleared (`popped`, blank cells).
#[derive(Clone, Debug, Default)]
pub struct Compaction {
    pub shifted: Vec<Cell>,
    pub popped: Vec<Cell>,
    first: u32,
    last: u32,
    deleted: usize,
}

impl Compaction {
    /// Plan the delete of `doomed` rows. Rows not in the index are ignored;
    /// `None` when nothing would be deleted.
    pub fn plan(index: &TableIndex, doomed: &[u32]) -> Option<Self> {
        let doomed: FxHashSet<u32> = doomed
            .iter()
            .copied()
            .filter(|row| index.contains_row(*row))
            .collect();
        let first = doomed.iter().copied().min()?;
        let last = index.last_row_index();

        let mut survivors = (first..=last).filter(|row| !doomed.contains(row));
        let mut shifted = Vec::new();
        let mut popped = Vec::new();
        for slot in first..=last {
            match survivors.next() {
                Some(source) => {
                    for cell in index.row_cells(source).into_iter().flat_map(|c| c.values()) {
                        let mut cell = cell.clone();
                        cell.set_row(slot);
                        shifted.push(cell);
                    }
                }
                None => popped.extend(
                    index
                        .columns
                        .iter()
                        .map(|column| Cell::blank(index.accessors, slot, column.index)),
                ),
            }
        }

        Some(Self {
            shifted,
            popped,
            first,
            last,
            deleted: doomed.len(),
        })
    }

    /// First row of the affected range.
    pub fn first_row(&self) -> u32 {
        self.first
    }

    /// Last row of the affected range, as it stood before the delete.
    pub fn last_row(&self) -> u32 {
        self.last
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }
}

enum TableState {
    Unfetched,
    Fetched(TableIndex),
}

/// A worksheet viewed as a table.
///
/// A table is either fetched (its index mirrors the worksheet) or unfetched;
/// every operation fetches first if needed. Remote worksheets start unfetched
/// so nothing is read until the table is used.
pub struct Table<B: TableBackend> {
    backend: B,
    state: TableState,
}

impl<B: TableBackend> Table<B> {
    /// Open and fetch immediately.
    pub fn open(backend: B) -> Result<Self, TableError> {
        let mut table = Self::deferred(backend);
        table.fetch()?;
        Ok(table)
    }

    /// Open without reading; the first operation fetches.
    pub fn deferred(backend: B) -> Self {
        Self {
            backend,
            state: TableState::Unfetched,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self.state, TableState::Fetched(_))
    }

    /// Read the whole worksheet and rebuild the index from scratch.
    pub fn fetch(&mut self) -> Result<(), TableError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "table_fetch",
            table = %self.backend.name(),
            backend = self.backend.accessors().backend
        )
        .entered();

        let snapshot = self.backend.fetch()?;
        let index = TableIndex::from_snapshot(self.backend.accessors(), snapshot);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            columns = index.columns().len(),
            rows = index.size(),
            "table fetched"
        );

        self.state = TableState::Fetched(index);
        Ok(())
    }

    fn parts(&mut self) -> Result<(&mut TableIndex, &mut B), TableError> {
        if !self.is_fetched() {
            self.fetch()?;
        }
        match &mut self.state {
            TableState::Fetched(index) => Ok((index, &mut self.backend)),
            TableState::Unfetched => Err(TableError::UnknownWorksheet(
                self.backend.name().to_string(),
            )),
        }
    }

    /// The fetched index.
    pub fn index(&mut self) -> Result<&TableIndex, TableError> {
        let (index, _) = self.parts()?;
        Ok(index)
    }

    /// Records of every row where all clauses hold, ascending by row index.
    pub fn query(&mut self, clause: Option<&Where>) -> Result<Vec<Row>, TableError> {
        let (index, _) = self.parts()?;
        let rows = rows_matching_all(index, clause)?;
        Ok(rows.into_iter().filter_map(|row| index.record(row)).collect())
    }

    /// Append a row after the last one and return its row index.
    ///
    /// `data` must hold a value for every schema column; other keys, [`ROW_IDX`]
    /// included, are ignored.
    pub fn insert(&mut self, data: &Row) -> Result<u32, TableError> {
        let (index, backend) = self.parts()?;
        let values = index
            .columns()
            .iter()
            .map(|column| {
                data.get(&column.name)
                    .map(|value| (column.index, value.clone()))
                    .ok_or_else(|| TableError::MissingValue {
                        column: column.name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let row = index.last_row_index() + 1;
        let cells = backend.insert_row(row, &values)?;
        index.register_row(row, cells);
        Ok(row)
    }

    /// Write `data` into matching rows and return how many matched.
    ///
    /// A [`ROW_IDX`] entry in `data` targets that single row and takes precedence
    /// over `clause`. Only schema columns present in `data` are written.
    pub fn update(&mut self, data: &Row, clause: Option<&Where>) -> Result<usize, TableError> {
        let pinned;
        let target = match data.get(ROW_IDX) {
            Some(value) => {
                pinned = Where::new().row(row_index_of(value)?);
                &pinned
            }
            None => clause.ok_or(TableError::RowIndexRequired)?,
        };

        let (index, _) = self.parts()?;
        let mut values = FxHashMap::default();
        let mut select = Vec::new();
        for column in index.columns() {
            if let Some(value) = data.get(&column.name) {
                values.insert(column.index, value.clone());
                select.push(column.name.clone());
            }
        }
        let select: Vec<&str> = select.iter().map(String::as_str).collect();

        self.traverse_with(
            |cell| {
                if let Some(value) = values.get(&cell.column()) {
                    cell.set_value(value.clone());
                }
                Ok(())
            },
            Some(target),
            Some(select.as_slice()),
        )
    }

    /// Delete matching rows, shifting later rows up, and return how many went.
    pub fn delete(&mut self, clause: Option<&Where>) -> Result<usize, TableError> {
        let (index, backend) = self.parts()?;
        let doomed = rows_matching_all(index, clause)?;
        let Some(plan) = Compaction::plan(index, &doomed) else {
            return Ok(0);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            table = %backend.name(),
            deleted = plan.deleted(),
            first = plan.first_row(),
            last = plan.last_row(),
            shifted = plan.shifted.len(),
            popped = plan.popped.len(),
            "delete compaction"
        );

        backend.commit_delete(&plan)?;
        index.apply_compaction(&plan);
        Ok(plan.deleted())
    }

    /// Run `f` on every selected cell of every matching row, then write the
    /// touched cells back in one backend call. Returns the number of rows matched.
    /// A row matches only when every clause of `clause` holds for it.
    ///
    /// `select` names schema columns; `None` selects all of them.
    pub fn traverse<F>(
        &mut self,
        mut f: F,
        clause: Option<&Where>,
        select: Option<&[&str]>,
    ) -> Result<usize, TableError>
    where
        F: FnMut(&mut Cell),
    {
        self.traverse_with(
            |cell| {
                f(cell);
                Ok(())
            },
            clause,
            select,
        )
    }

    fn traverse_with<F>(
        &mut self,
        mut f: F,
        clause: Option<&Where>,
        select: Option<&[&str]>,
    ) -> Result<usize, TableError>
    where
        F: FnMut(&mut Cell) -> Result<(), TableError>,
    {
        let (index, backend) = self.parts()?;
        if let Some(names) = select {
            for name in names {
                index.require_column(name)?;
            }
        }
        let selected: Vec<&str> = index
            .columns()
            .iter()
            .map(|column| column.name.as_str())
            .filter(|name| select.is_none_or(|names| names.contains(name)))
            .collect();

        let rows = rows_matching_all(index, clause)?;
        let mut touched = Vec::with_capacity(rows.len() * selected.len());
        for &row in &rows {
            for name in &selected {
                if let Some(cell) = index.cell(row, name) {
                    let mut cell = cell.clone();
                    f(&mut cell)?;
                    touched.push(cell);
                }
            }
        }

        if !touched.is_empty() {
            backend.commit_cells(&touched)?;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                table = %backend.name(),
                rows = rows.len(),
                cells = touched.len(),
                "traverse committed"
            );
        }
        for cell in touched {
            index.store(cell);
        }
        Ok(rows.len())
    }

    /// Apply a formatter to matching cells. Returns the number of rows formatted.
    ///
    /// An empty formatter with no clause is a no-op and returns 0 without reading
    /// or writing anything beyond the initial fetch.
    pub fn format(
        &mut self,
        request: impl Into<FormatRequest<B::Formatter>>,
        clause: Option<&Where>,
        select: Option<&[&str]>,
    ) -> Result<usize, TableError> {
        let request: FormatRequest<B::Formatter> = request.into();
        let formatter = request.into_formatter()?;
        if formatter.is_empty() && clause.is_none() {
            return Ok(0);
        }
        self.traverse_with(|cell| formatter.apply(cell), clause, select)
    }

    /// Number of data rows.
    pub fn len(&mut self) -> Result<usize, TableError> {
        Ok(self.parts()?.0.size())
    }

    pub fn is_empty(&mut self) -> Result<bool, TableError> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&mut self, row: u32) -> Result<bool, TableError> {
        Ok(self.parts()?.0.contains_row(row))
    }

    pub fn get(&mut self, row: u32) -> Result<Option<Row>, TableError> {
        Ok(self.query(Some(&Where::new().row(row)))?.into_iter().next())
    }

    /// Records whose row index satisfies `f`.
    pub fn get_matching(
        &mut self,
        f: impl Fn(u32) -> bool + 'static,
    ) -> Result<Vec<Row>, TableError> {
        self.query(Some(&Where::new().row_matching(f)))
    }

    /// Update `row` if it exists, otherwise insert `data` as a new row.
    /// Returns the row index written.
    pub fn set(&mut self, row: u32, data: &Row) -> Result<u32, TableError> {
        if self.contains(row)? {
            let mut data = data.clone();
            data.remove(ROW_IDX);
            self.update(&data, Some(&Where::new().row(row)))?;
            Ok(row)
        } else {
            self.insert(data)
        }
    }

    /// Delete `row` if it exists.
    pub fn remove(&mut self, row: u32) -> Result<bool, TableError> {
        if !self.contains(row)? {
            return Ok(false);
        }
        Ok(self.delete(Some(&Where::new().row(row)))? > 0)
    }

    /// Schema column names in physical order.
    pub fn columns(&mut self) -> Result<Vec<String>, TableError> {
        let (index, _) = self.parts()?;
        Ok(index.columns().iter().map(|c| c.name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::LOCAL_ACCESSORS;
    use crate::error::IoError;
    use crate::format::LocalFormatter;

    fn snapshot(ids: &[i64]) -> SheetSnapshot {
        let header = vec![
            Cell::new(&LOCAL_ACCESSORS, 1, 1, "id"),
            Cell::new(&LOCAL_ACCESSORS, 1, 3, "name"),
        ];
        let rows = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let row = i as u32 + 2;
                vec![
                    Cell::new(&LOCAL_ACCESSORS, row, 1, *id),
                    Cell::new(&LOCAL_ACCESSORS, row, 3, format!("n{id}")),
                ]
            })
            .collect();
        SheetSnapshot { header, rows }
    }

    fn ids(index: &TableIndex) -> Vec<i64> {
        index
            .rows()
            .filter_map(|(_, cells)| cells.get("id").and_then(|c| c.value().as_i64()))
            .collect()
    }

    #[test]
    fn snapshot_trims_trailing_blank_rows() {
        let mut snap = snapshot(&[0, 1]);
        snap.rows.push(vec![Cell::blank(&LOCAL_ACCESSORS, 4, 1)]);
        snap.rows.push(Vec::new());
        let index = TableIndex::from_snapshot(&LOCAL_ACCESSORS, snap);
        assert_eq!(index.size(), 2);
        assert!(index.is_contiguous());
        assert_eq!(index.columns()[1], ColumnId { name: "name".into(), index: 3 });
    }

    #[test]
    fn single_delete_shifts_tail_up() {
        let mut index = TableIndex::from_snapshot(&LOCAL_ACCESSORS, snapshot(&[0, 1, 2, 3, 4]));
        let plan = Compaction::plan(&index, &[3]).unwrap();

        assert_eq!((plan.first_row(), plan.last_row(), plan.deleted()), (3, 6, 1));
        // slots 3..=5 take rows 4..=6, two columns each
        assert_eq!(plan.shifted.len(), 6);
        assert!(plan.popped.iter().all(|c| c.row() == 6 && c.value().is_empty()));
        assert_eq!(plan.popped.len(), 2);

        index.apply_compaction(&plan);
        assert!(index.is_contiguous());
        assert_eq!(ids(&index), vec![0, 2, 3, 4]);
        assert_eq!(
            index.cell(3, "name").map(|c| c.value().clone()),
            Some(CellValue::from("n2"))
        );
        assert_eq!(index.cell(3, "id").map(|c| c.row()), Some(3));
    }

    #[test]
    fn scattered_deletes_compact_in_one_plan() {
        let mut index = TableIndex::from_snapshot(&LOCAL_ACCESSORS, snapshot(&[0, 1, 2, 3, 4]));
        let plan = Compaction::plan(&index, &[2, 4, 6]).unwrap();
        assert_eq!(plan.first_row(), 2);
        assert_eq!(plan.popped.len(), 6);

        index.apply_compaction(&plan);
        assert_eq!(index.size(), 2);
        assert!(index.is_contiguous());
        assert_eq!(ids(&index), vec![1, 3]);
    }

    #[test]
    fn plan_ignores_missing_rows() {
        let index = TableIndex::from_snapshot(&LOCAL_ACCESSORS, snapshot(&[0, 1]));
        assert!(Compaction::plan(&index, &[]).is_none());
        assert!(Compaction::plan(&index, &[9]).is_none());
    }

    /// Serves a fixed snapshot and refuses every write.
    struct ReadOnly(Option<SheetSnapshot>);

    impl TableBackend for ReadOnly {
        type Formatter = LocalFormatter;

        fn name(&self) -> &str {
            "ro"
        }

        fn accessors(&self) -> &'static CellAccessors {
            &LOCAL_ACCESSORS
        }

        fn fetch(&mut self) -> Result<SheetSnapshot, IoError> {
            self.0.take().ok_or_else(|| IoError::from_backend("ro", "fetched twice"))
        }

        fn insert_row(&mut self, _: u32, _: &[(u32, CellValue)]) -> Result<Vec<Cell>, IoError> {
            Err(IoError::from_backend("ro", "read only"))
        }

        fn commit_delete(&mut self, _: &Compaction) -> Result<(), IoError> {
            Err(IoError::from_backend("ro", "read only"))
        }

        fn commit_cells(&mut self, _: &[Cell]) -> Result<(), IoError> {
            Err(IoError::from_backend("ro", "read only"))
        }
    }

    #[test]
    fn failed_backend_write_leaves_index_untouched() {
        let mut table = Table::deferred(ReadOnly(Some(snapshot(&[0, 1, 2]))));
        assert!(!table.is_fetched());

        let err = table.delete(Some(&Where::new().eq("id", 1))).unwrap_err();
        assert!(matches!(err, TableError::Io(IoError::Backend { .. })));
        let err = table
            .traverse(|c| c.set_value("x"), None, Some(&["name"][..]))
            .unwrap_err();
        assert!(matches!(err, TableError::Io(_)));

        let index = table.index().unwrap();
        assert_eq!(ids(index), vec![0, 1, 2]);
        assert_eq!(
            index.cell(2, "name").map(|c| c.value().clone()),
            Some(CellValue::from("n0"))
        );
    }

    #[test]
    fn validation_happens_before_backend_calls() {
        let mut table = Table::open(ReadOnly(Some(snapshot(&[0])))).unwrap();

        let mut missing = Row::new();
        missing.insert("id".into(), 5.into());
        assert!(matches!(
            table.insert(&missing),
            Err(TableError::MissingValue { column }) if column == "name"
        ));
        assert!(matches!(
            table.traverse(|_| {}, None, Some(&["nope"][..])),
            Err(TableError::UnknownColumn { .. })
        ));
        assert!(matches!(
            table.update(&missing, None),
            Err(TableError::RowIndexRequired)
        ));
        // nothing matched, so nothing is written
        assert_eq!(table.delete(Some(&Where::new().eq("id", 42))).unwrap(), 0);
        assert_eq!(table.format(LocalFormatter::new(), None, None).unwrap(), 0);
    }
}
