//! 1-based worksheet coordinates.
//!
//! Row 1 is the header row of a table and column 1 is `A`. Both indices are
//! physical positions; the table engine keeps logical row indices equal to them.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors returned when constructing coordinates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordError {
    ZeroIndex,
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::ZeroIndex => write!(f, "row and column indices must be 1-based (>= 1)"),
        }
    }
}

impl std::error::Error for CoordError {}

/// Absolute cell position, 1-based on both axes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub fn new(row: u32, col: u32) -> Result<Self, CoordError> {
        if row == 0 || col == 0 {
            return Err(CoordError::ZeroIndex);
        }
        Ok(Self { row, col })
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

/// Render a 1-based column number as letters (`1 -> A`, `27 -> AA`).
/// Column 0 has no letters and renders as an empty string.
pub fn column_to_letters(col: u32) -> String {
    let mut buf = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        buf.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}
