//! Reference expansion.
//!
//! Before a formula is parsed every reference token outside string literals
//! is resolved against the grid:
//!
//! - **Single cells** are substituted inline: `A1+B1` with A1=10 and B1="x"
//!   becomes `10+"x"`. Empty cells read as `0`.
//! - **Ranges** stay in the text (`SUM(A1:B3)`) and their values are
//!   collected, keyed by the range text, for function arguments.
//!
//! Every cell touched is recorded as a dependency of the formula.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use super::cell::ValueLookup;
use super::cell_ref::{CellRange, CellRef};
use super::error::{FormulaError, is_error_tag};
use super::format::{parse_number, quote_text};
use super::options::{ErrorPolicy, EvalOptions};
use super::scan::{map_outside_strings, reference_token_re, try_replace_all};

/// Result of expanding the references of one expression.
#[derive(Clone, Debug, Default)]
pub struct Expansion {
    /// The expression with single-cell references replaced by literals.
    pub expression: String,
    /// Values of every range token, row-major, keyed by the range text.
    pub ranges: HashMap<String, Vec<String>>,
}

/// Expand references in `expression` (a formula without its marker).
///
/// Dependencies are added to `deps` as they are resolved, so on failure
/// `deps` still holds everything read before the failing token.
pub fn expand_references(
    expression: &str,
    lookup: &dyn ValueLookup,
    options: &EvalOptions,
    deps: &mut BTreeSet<CellRef>,
) -> Result<Expansion, FormulaError> {
    let mut ranges = HashMap::new();
    let re = reference_token_re();

    let expanded = map_outside_strings(expression, |segment| {
        try_replace_all(re, segment, |caps| {
            let token = &caps[0];
            if caps.get(2).is_some() {
                let values = resolve_range(token, lookup, options, deps)?;
                ranges.insert(token.to_string(), values);
                return Ok(token.to_string());
            }

            let cell = CellRef::from_str(token).ok_or(FormulaError::Ref)?;
            deps.insert(cell);
            let value = lookup.lookup(&cell).unwrap_or_default();
            trace!(%cell, value = %value, "resolved reference");
            Ok(substitute(&value, options))
        })
    })?;

    Ok(Expansion {
        expression: expanded,
        ranges,
    })
}

fn resolve_range(
    token: &str,
    lookup: &dyn ValueLookup,
    options: &EvalOptions,
    deps: &mut BTreeSet<CellRef>,
) -> Result<Vec<String>, FormulaError> {
    let range = CellRange::parse(token).map_err(|_| FormulaError::Ref)?;
    match range.len() {
        Some(len) if len <= options.max_range_cells => {}
        _ => return Err(FormulaError::Ref),
    }

    let values: Vec<String> = range
        .cells()
        .map(|cell| {
            deps.insert(cell);
            lookup.lookup(&cell).unwrap_or_default()
        })
        .collect();
    trace!(range = token, cells = values.len(), "resolved range");
    Ok(values)
}

/// Literal text for a single referenced value.
fn substitute(value: &str, options: &EvalOptions) -> String {
    if value.trim().is_empty() {
        return "0".to_string();
    }
    if is_error_tag(value) {
        return match options.error_policy {
            ErrorPolicy::Coerce => "0".to_string(),
            ErrorPolicy::Propagate => FormulaError::from_tag(value)
                .unwrap_or(FormulaError::Generic)
                .tag()
                .to_string(),
        };
    }
    match parse_number(value) {
        Some(n) if n < 0.0 => format!("({})", value.trim()),
        Some(_) => value.trim().to_string(),
        None => quote_text(value),
    }
}

/// Cells a formula reads, found by scanning its text without evaluating it.
///
/// Ranges are expanded up to `max_range_cells`; larger or malformed ranges
/// and malformed references contribute nothing. Non-formulas have no
/// dependencies.
pub fn extract_dependencies(formula: &str, options: &EvalOptions) -> BTreeSet<CellRef> {
    let mut deps = BTreeSet::new();
    let Some(expression) = formula.strip_prefix(super::cell::FORMULA_MARKER) else {
        return deps;
    };
    let re = reference_token_re();
    let _ = map_outside_strings(expression, |segment| {
        for caps in re.captures_iter(segment) {
            let token = &caps[0];
            if caps.get(2).is_some() {
                if let Ok(range) = CellRange::parse(token) {
                    if range.len().is_some_and(|n| n <= options.max_range_cells) {
                        deps.extend(range.cells());
                    }
                }
            } else if let Some(cell) = CellRef::from_str(token) {
                deps.insert(cell);
            }
        }
        Ok::<_, std::convert::Infallible>(String::new())
    });
    deps
}
