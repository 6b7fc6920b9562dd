//! Change notification for rendering and mirroring collaborators.

use sheetcalc_engine::engine::{CellRef, CellState};

/// Why a cell's displayed value was (re)computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeCause {
    /// The cell itself was edited.
    Edit,
    /// A cell it reads changed.
    Cascade,
    /// The cell was a fill target.
    Fill,
}

/// A single cell update, as seen by listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellChange {
    pub cell: CellRef,
    pub value: String,
    pub state: CellState,
    pub cause: ChangeCause,
}

/// Receives every cell update made by a [`Document`](super::Document).
pub trait CellListener {
    fn cell_changed(&mut self, change: &CellChange);
}

impl<F> CellListener for F
where
    F: FnMut(&CellChange),
{
    fn cell_changed(&mut self, change: &CellChange) {
        self(change)
    }
}
