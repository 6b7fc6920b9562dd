//! `.calc` snapshot storage.
//!
//! A snapshot is the raw input of every non-empty cell plus the grid bounds:
//!
//! ```text
//! # Sheetcalc Spreadsheet
//! # size: 3x2
//! A1: 10
//! A2: "total"
//! B1: =A1*2
//! ```

mod parser;
mod writer;

pub use parser::{parse_calc, parse_calc_content};
pub use writer::{write_calc, write_calc_content};

use sheetcalc_engine::engine::CellRef;

/// Raw inputs of a sheet, in row-major order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<(CellRef, String)>,
}
