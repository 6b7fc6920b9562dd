//! sheetcalc-core - Document model (recalculation, fills) + storage.

pub mod document;
pub mod error;
pub mod storage;

pub use document::{CellChange, CellListener, ChangeCause, Document};
pub use error::{Result, SheetError};

pub use sheetcalc_engine::engine::{CellRef, CellState, ErrorPolicy, EvalOptions};
