//! Error types for Sheetcalc core.

use sheetcalc_engine::engine::RefError;
use thiserror::Error;

/// Errors returned by document operations.
///
/// Formula failures are not errors here: they are stored as cell values.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Reference(#[from] RefError),

    #[error("No file path set")]
    NoFilePath,
}

pub type Result<T> = std::result::Result<T, SheetError>;
