//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates, and
//! expansion of ranges ("A1:B3") into the cells they cover.
//!
//! # Examples
//!
//! ```
//! use sheetcalc_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.row, 2); // 0-indexed
//! assert_eq!(cell.col, 1);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::error::RefError;

/// A reference to a cell by row and column indices (0-indexed).
///
/// Ordering is row-major, which is the order ranges are walked in.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]+)(?<numbers>[0-9]+)$")
            .expect("A1 reference regex must compile")
    })
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "B2", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;

        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellRef::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Move by a signed row/column delta. `None` when either coordinate
    /// would become negative.
    pub fn offset(&self, delta_row: i64, delta_col: i64) -> Option<CellRef> {
        let row = i64::try_from(self.row).ok()?.checked_add(delta_row)?;
        let col = i64::try_from(self.col).ok()?.checked_add(delta_col)?;
        if row < 0 || col < 0 {
            return None;
        }
        Some(CellRef::new(row as usize, col as usize))
    }
}

impl std::str::FromStr for CellRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| RefError::InvalidReference(s.to_string()))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

/// An inclusive rectangle of cells, normalized so `start` is the top-left
/// corner and `end` the bottom-right one.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Build a range from two corners given in any order.
    pub fn new(a: CellRef, b: CellRef) -> CellRange {
        CellRange {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse "A1:B5" (either corner order).
    pub fn parse(range: &str) -> Result<CellRange, RefError> {
        let invalid = || RefError::InvalidRange(range.to_string());
        let (start, end) = range.split_once(':').ok_or_else(invalid)?;
        let start = CellRef::from_str(start).ok_or_else(invalid)?;
        let end = CellRef::from_str(end).ok_or_else(invalid)?;
        Ok(CellRange::new(start, end))
    }

    pub fn rows(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    pub fn cols(&self) -> usize {
        self.end.col - self.start.col + 1
    }

    /// Number of cells covered, `None` on overflow.
    pub fn len(&self) -> Option<usize> {
        self.rows().checked_mul(self.cols())
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Walk every cell row-major. Each call starts a fresh walk.
    pub fn cells(&self) -> CellRangeIter {
        CellRangeIter {
            range: *self,
            next: Some(self.start),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl IntoIterator for CellRange {
    type Item = CellRef;
    type IntoIter = CellRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.cells()
    }
}

/// Row-major iterator over a [`CellRange`].
#[derive(Clone, Debug)]
pub struct CellRangeIter {
    range: CellRange,
    next: Option<CellRef>,
}

impl Iterator for CellRangeIter {
    type Item = CellRef;

    fn next(&mut self) -> Option<CellRef> {
        let current = self.next?;
        self.next = if current.col < self.range.end.col {
            Some(CellRef::new(current.row, current.col + 1))
        } else if current.row < self.range.end.row {
            Some(CellRef::new(current.row + 1, self.range.start.col))
        } else {
            None
        };
        Some(current)
    }
}

/// Decode "C12" into a zero-based coordinate.
pub fn to_coordinate(reference: &str) -> Result<CellRef, RefError> {
    reference.parse()
}

/// Encode a zero-based coordinate as "C12".
pub fn to_reference(row: usize, col: usize) -> String {
    CellRef::new(row, col).to_string()
}

/// Decode "A1:B3" into its normalized range. Iterate it (repeatedly, if
/// needed) with [`CellRange::cells`].
pub fn to_range_coordinates(range: &str) -> Result<CellRange, RefError> {
    CellRange::parse(range)
}
