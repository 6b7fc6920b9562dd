//! Grid storage and cell classification.
//!
//! - [`Grid`] - sparse display values addressed by [`CellRef`] (backed by `DashMap`)
//! - [`ValueLookup`] - read access used by the evaluator
//! - [`CellState`] - literal / formula classification of a cell

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::cell_ref::CellRef;
use super::error::is_error_tag;

/// Reserved first character of every formula.
pub const FORMULA_MARKER: char = '=';

/// True when raw input is a formula (starts with the marker).
pub fn is_formula(input: &str) -> bool {
    input.starts_with(FORMULA_MARKER)
}

/// Lifecycle state of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    Literal,
    FormulaValid,
    FormulaError,
}

impl CellState {
    /// State of a formula cell given its computed value.
    pub fn for_formula_result(value: &str) -> CellState {
        if is_error_tag(value) {
            CellState::FormulaError
        } else {
            CellState::FormulaValid
        }
    }
}

/// Read access to current display values.
///
/// `None` and `Some("")` both mean the cell is empty.
pub trait ValueLookup {
    fn lookup(&self, cell: &CellRef) -> Option<String>;
}

impl<F> ValueLookup for F
where
    F: Fn(&CellRef) -> Option<String>,
{
    fn lookup(&self, cell: &CellRef) -> Option<String> {
        self(cell)
    }
}

/// Sparse spreadsheet grid of display values.
///
/// Row/column bounds only ever grow. Any cell inside the bounds reads as
/// `""` until something is stored there.
#[derive(Debug, Default)]
pub struct Grid {
    cells: DashMap<CellRef, String>,
    rows: usize,
    cols: usize,
}

impl Grid {
    pub fn new() -> Grid {
        Grid::default()
    }

    /// An empty grid with the given bounds.
    pub fn with_size(rows: usize, cols: usize) -> Grid {
        Grid {
            cells: DashMap::new(),
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Grow bounds so `cell` is inside them.
    pub fn ensure_contains(&mut self, cell: &CellRef) {
        self.rows = self.rows.max(cell.row + 1);
        self.cols = self.cols.max(cell.col + 1);
    }

    /// Grow bounds to at least `rows` x `cols`.
    pub fn ensure_size(&mut self, rows: usize, cols: usize) {
        self.rows = self.rows.max(rows);
        self.cols = self.cols.max(cols);
    }

    pub fn add_row(&mut self) -> usize {
        self.rows += 1;
        self.rows - 1
    }

    pub fn add_column(&mut self) -> usize {
        self.cols += 1;
        self.cols - 1
    }

    pub fn in_bounds(&self, cell: &CellRef) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Display value at `cell`; `""` when unset.
    pub fn get(&self, cell: &CellRef) -> String {
        self.cells
            .get(cell)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Store a display value, growing bounds when needed. Storing `""`
    /// drops the entry.
    pub fn set(&mut self, cell: CellRef, value: String) {
        self.ensure_contains(&cell);
        if value.is_empty() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    /// Non-empty cells, unordered.
    pub fn non_empty(&self) -> Vec<(CellRef, String)> {
        self.cells
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drop every value and reset bounds.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.rows = 0;
        self.cols = 0;
    }
}

impl ValueLookup for Grid {
    fn lookup(&self, cell: &CellRef) -> Option<String> {
        self.cells.get(cell).map(|v| v.value().clone())
    }
}
