//! Formula engine API.
//!
//! This module provides the computation engine for the spreadsheet:
//!
//! - [`CellRef`], [`CellRange`] - Reference codec (A1 notation <-> row/col indices)
//! - [`Grid`], [`ValueLookup`] - Cell value storage and read access
//! - [`evaluate`], [`evaluate_formula`] - Formula evaluation to a display value
//! - [`adjust_formula`] - Relative reference translation for fills
//! - [`detect_cycle`] - Circular dependency detection
//! - [`extract_dependencies`] - Static dependency scan of a formula
//! - [`format_number`] - Number display
//! - [`function_help`] - One-line summaries of the built-in functions

mod adjust;
mod cell;
mod cell_ref;
pub(crate) mod criteria;
mod cycle;
mod error;
pub(crate) mod eval;
pub(crate) mod format;
mod lexer;
mod options;
pub(crate) mod parser;
mod preprocess;
mod scan;

pub use crate::builtins::function_help;
pub use adjust::adjust_formula;
pub use cell::{CellState, FORMULA_MARKER, Grid, ValueLookup, is_formula};
pub use cell_ref::{
    CellRange, CellRangeIter, CellRef, to_coordinate, to_range_coordinates, to_reference,
};
pub use criteria::{criterion_condition, sanitize_condition};
pub use cycle::{DependencyIndex, detect_cycle, is_on_cycle, is_on_cycle_within};
pub use error::{ERROR_TAG_MARKER, FormulaError, RefError, is_error_tag};
pub use eval::{Evaluation, evaluate, evaluate_formula};
pub use format::{Value, format_number, parse_number};
pub use options::{DEFAULT_MAX_RANGE_CELLS, ErrorPolicy, EvalOptions};
pub use preprocess::extract_dependencies;
