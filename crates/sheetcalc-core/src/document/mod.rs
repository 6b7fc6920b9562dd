//! Document state and logic (UI-agnostic).

mod io;
mod listener;
mod ops;
mod state;

pub use listener::{CellChange, CellListener, ChangeCause};
pub use state::Document;
