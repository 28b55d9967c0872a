//! Where-clause model and evaluator.
//!
//! A [`Where`] maps column names to a literal or a predicate, plus an optional
//! clause on the reserved [`ROW_IDX`] key. Evaluation runs in two passes over
//! a [`TableIndex`]: a union of rows matching any clause, then a filter keeping
//! rows for which every clause holds.

use crate::error::TableError;
use crate::table::TableIndex;
use cellbase_common::CellValue;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::fmt;

/// Reserved key naming the row index in where clauses and row records.
pub const ROW_IDX: &str = "row_idx";

/// Condition on a column's cell value.
pub enum Condition {
    Literal(CellValue),
    Predicate(Box<dyn Fn(&CellValue) -> bool>),
}

impl Condition {
    pub fn predicate(f: impl Fn(&CellValue) -> bool + 'static) -> Self {
        Condition::Predicate(Box::new(f))
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            Condition::Literal(expected) => value.loosely_eq(expected),
            Condition::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<CellValue> for Condition {
    fn from(value: CellValue) -> Self {
        Condition::Literal(value)
    }
}

/// Condition on the row index itself.
pub enum RowCondition {
    Literal(CellValue),
    Predicate(Box<dyn Fn(u32) -> bool>),
}

impl RowCondition {
    pub fn matches(&self, row: u32) -> bool {
        match self {
            RowCondition::Literal(expected) => CellValue::Int(row as i64).loosely_eq(expected),
            RowCondition::Predicate(f) => f(row),
        }
    }

    /// The single row a literal clause can address, if any.
    fn literal_row(&self) -> Option<u32> {
        match self {
            RowCondition::Literal(v) => v.as_i64().and_then(|i| u32::try_from(i).ok()),
            RowCondition::Predicate(_) => None,
        }
    }
}

impl fmt::Debug for RowCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowCondition::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            RowCondition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Match conditions for table operations.
///
/// ```
/// use cellbase::Where;
///
/// let w = Where::new().eq("id", 2).eq("name", "x");
/// assert_eq!(w.len(), 2);
/// let tail = Where::new().row_matching(|r| r > 3);
/// assert!(tail.row_condition().is_some());
/// ```
#[derive(Default)]
pub struct Where {
    row: Option<RowCondition>,
    columns: Vec<(String, Condition)>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match exactly one row index.
    pub fn row(mut self, row: u32) -> Self {
        self.row = Some(RowCondition::Literal(CellValue::from(row)));
        self
    }

    pub fn row_matching(mut self, f: impl Fn(u32) -> bool + 'static) -> Self {
        self.row = Some(RowCondition::Predicate(Box::new(f)));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.with(column, Condition::Literal(value.into()))
    }

    pub fn matching(
        self,
        column: impl Into<String>,
        f: impl Fn(&CellValue) -> bool + 'static,
    ) -> Self {
        self.with(column, Condition::predicate(f))
    }

    /// Add or replace the clause for `column`. The [`ROW_IDX`] key sets the row clause.
    pub fn with(mut self, column: impl Into<String>, condition: Condition) -> Self {
        let column = column.into();
        if column == ROW_IDX {
            self.row = Some(match condition {
                Condition::Literal(v) => RowCondition::Literal(v),
                Condition::Predicate(f) => {
                    RowCondition::Predicate(Box::new(move |row: u32| f(&CellValue::from(row))))
                }
            });
            return self;
        }
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = condition,
            None => self.columns.push((column, condition)),
        }
        self
    }

    /// Number of clauses, the row clause included.
    pub fn len(&self) -> usize {
        self.columns.len() + usize::from(self.row.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_condition(&self) -> Option<&RowCondition> {
        self.row.as_ref()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.columns.iter().map(|(name, c)| (name.as_str(), c))
    }
}

impl fmt::Debug for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        if let Some(row) = &self.row {
            map.entry(&ROW_IDX, row);
        }
        for (name, cond) in &self.columns {
            map.entry(name, cond);
        }
        map.finish()
    }
}

/// Convert a row-index value (as found in a row record) into a row number.
pub fn row_index_of(value: &CellValue) -> Result<u32, TableError> {
    value
        .as_i64()
        .and_then(|i| u32::try_from(i).ok())
        .filter(|row| *row >= 2)
        .ok_or_else(|| TableError::InvalidRowIndex {
            value: value.to_string(),
        })
}

/// Rows satisfying at least one clause.
pub fn row_indices_where(index: &TableIndex, clause: &Where) -> Result<BTreeSet<u32>, TableError> {
    let mut rows = BTreeSet::new();
    if let Some(cond) = &clause.row {
        match cond.literal_row() {
            Some(row) => {
                if index.contains_row(row) {
                    rows.insert(row);
                }
            }
            None => rows.extend(index.row_numbers().filter(|row| cond.matches(*row))),
        }
    }
    for (name, cond) in &clause.columns {
        index.require_column(name)?;
        for (row, cells) in index.rows() {
            if rows.contains(&row) {
                continue;
            }
            if cells.get(name).is_some_and(|cell| cond.matches(cell.value())) {
                rows.insert(row);
            }
        }
    }
    Ok(rows)
}

/// Clause keys satisfied by one row, [`ROW_IDX`] included.
pub fn column_names_where<'w>(
    index: &TableIndex,
    row: u32,
    clause: &'w Where,
) -> Result<FxHashSet<&'w str>, TableError> {
    let mut names = FxHashSet::default();
    if clause.row.as_ref().is_some_and(|cond| cond.matches(row)) {
        names.insert(ROW_IDX);
    }
    let cells = index.row_cells(row);
    for (name, cond) in &clause.columns {
        index.require_column(name)?;
        let value = cells
            .and_then(|cells| cells.get(name))
            .map(|cell| cell.value());
        if value.is_some_and(|v| cond.matches(v)) {
            names.insert(name.as_str());
        }
    }
    Ok(names)
}

/// Rows for which every clause holds, ascending. `None` matches every row; an
/// empty clause set matches none.
pub fn rows_matching_all(index: &TableIndex, clause: Option<&Where>) -> Result<Vec<u32>, TableError> {
    let Some(clause) = clause else {
        return Ok(index.row_numbers().collect());
    };
    if clause.is_empty() {
        return Ok(Vec::new());
    }
    let mut matched = Vec::new();
    for row in row_indices_where(index, clause)? {
        if column_names_where(index, row, clause)?.len() == clause.len() {
            matched.push(row);
        }
    }
    Ok(matched)
}
