//! Error types for the formula engine.
//!
//! Two families live here:
//!
//! - [`FormulaError`] - value-level failures. They never escape
//!   [`evaluate_formula`](super::evaluate_formula); their `Display` is the
//!   error tag stored in the grid (`#REF!`, `#DIV/0!`, ...).
//! - [`RefError`] - structural failures of the reference codec and of
//!   formula adjustment, returned to the caller as `Err`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker that starts every error tag.
pub const ERROR_TAG_MARKER: char = '#';

/// A value-level formula error, rendered as its spreadsheet tag.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    #[error("#REF!")]
    Ref,
    #[error("#NAME?")]
    Name,
    #[error("#VALUE!")]
    Value,
    #[error("#DIV/0!")]
    DivZero,
    #[error("#NUM!")]
    Num,
    #[error("#N/A")]
    NotAvailable,
    #[error("#CYCLE!")]
    Cycle,
    #[error("#ERROR!")]
    Generic,
}

impl FormulaError {
    pub const ALL: [FormulaError; 8] = [
        FormulaError::Ref,
        FormulaError::Name,
        FormulaError::Value,
        FormulaError::DivZero,
        FormulaError::Num,
        FormulaError::NotAvailable,
        FormulaError::Cycle,
        FormulaError::Generic,
    ];

    /// The tag text stored in a cell, e.g. `#REF!`.
    pub fn tag(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Name => "#NAME?",
            FormulaError::Value => "#VALUE!",
            FormulaError::DivZero => "#DIV/0!",
            FormulaError::Num => "#NUM!",
            FormulaError::NotAvailable => "#N/A",
            FormulaError::Cycle => "#CYCLE!",
            FormulaError::Generic => "#ERROR!",
        }
    }

    /// Parse a known error tag. Unknown `#...` text is not a tag.
    pub fn from_tag(tag: &str) -> Option<FormulaError> {
        Self::ALL.into_iter().find(|e| e.tag() == tag)
    }
}

/// True when a display value is an error tag (starts with `#`).
pub fn is_error_tag(value: &str) -> bool {
    value.starts_with(ERROR_TAG_MARKER)
}

/// Structural failures of reference text.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum RefError {
    #[error("invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for err in FormulaError::ALL {
            assert_eq!(FormulaError::from_tag(err.tag()), Some(err));
            assert_eq!(err.to_string(), err.tag());
        }
        assert_eq!(FormulaError::from_tag("#BOGUS!"), None);
    }

    #[test]
    fn test_is_error_tag() {
        assert!(is_error_tag("#DIV/0!"));
        assert!(is_error_tag("#anything"));
        assert!(!is_error_tag("12"));
        assert!(!is_error_tag(""));
    }
}
