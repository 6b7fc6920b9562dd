//! Evaluation options.

use serde::{Deserialize, Serialize};

/// Ranges above this many cells fail with `#REF!`.
pub const DEFAULT_MAX_RANGE_CELLS: usize = 1_000_000;

/// How a formula treats a referenced cell whose value is an error tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Error-valued cells read as `0`.
    #[default]
    Coerce,
    /// Referencing an error-valued cell yields that error.
    Propagate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    pub error_policy: ErrorPolicy,
    pub max_range_cells: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            error_policy: ErrorPolicy::Coerce,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }
}
