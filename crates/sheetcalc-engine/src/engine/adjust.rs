//! Relative reference adjustment for filled formulas.

use tracing::debug;

use super::cell::is_formula;
use super::cell_ref::CellRef;
use super::error::{FormulaError, RefError};
use super::scan::{map_outside_strings, reference_token_re, try_replace_all};

/// Translate every reference in `formula` as if the formula were copied
/// from `from` to `to`.
///
/// Rules:
/// - `A1+B1` copied one row down becomes `A2+B2`
/// - ranges move endpoint by endpoint: `SUM(A1:B2)` -> `SUM(B3:C4)` for (+2, +1)
/// - a reference moved before row 1 or column A becomes `#REF!` (a range
///   with such an endpoint becomes a single `#REF!`)
/// - references inside string literals are left alone
/// - non-formulas are returned unchanged
///
/// Structurally invalid reference text (e.g. `A0`) is an error.
pub fn adjust_formula(formula: &str, from: &CellRef, to: &CellRef) -> Result<String, RefError> {
    if !is_formula(formula) {
        return Ok(formula.to_string());
    }
    let delta_row = to.row as i64 - from.row as i64;
    let delta_col = to.col as i64 - from.col as i64;
    if delta_row == 0 && delta_col == 0 {
        return Ok(formula.to_string());
    }

    let re = reference_token_re();
    let adjusted = map_outside_strings(formula, |segment| {
        try_replace_all(re, segment, |caps| {
            let start = offset_ref(&caps[1], delta_row, delta_col)?;
            let Some(end) = caps.get(2) else {
                return Ok(start.map_or_else(ref_error, |c| c.to_string()));
            };
            let end = offset_ref(end.as_str(), delta_row, delta_col)
                .map_err(|_| RefError::InvalidRange(caps[0].to_string()))?;
            Ok(match (start, end) {
                (Some(a), Some(b)) => format!("{}:{}", a, b),
                _ => ref_error(),
            })
        })
    })?;

    debug!(formula, %adjusted, delta_row, delta_col, "adjusted formula");
    Ok(adjusted)
}

fn offset_ref(token: &str, delta_row: i64, delta_col: i64) -> Result<Option<CellRef>, RefError> {
    let cell: CellRef = token.parse()?;
    Ok(cell.offset(delta_row, delta_col))
}

fn ref_error() -> String {
    FormulaError::Ref.tag().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjust(formula: &str, from: (usize, usize), to: (usize, usize)) -> String {
        adjust_formula(
            formula,
            &CellRef::new(from.0, from.1),
            &CellRef::new(to.0, to.1),
        )
        .unwrap()
    }

    #[test]
    fn test_fill_down_one_row() {
        assert_eq!(adjust("=A1+B1", (1, 1), (2, 1)), "=A2+B2");
    }

    #[test]
    fn test_fill_across_columns() {
        assert_eq!(adjust("=A1*2", (0, 1), (0, 3)), "=C1*2");
        assert_eq!(adjust("=Z1", (0, 0), (0, 1)), "=AA1");
    }

    #[test]
    fn test_ranges_move_both_endpoints() {
        assert_eq!(adjust("=SUM(A1:B2)", (0, 0), (2, 1)), "=SUM(B3:C4)");
    }

    #[test]
    fn test_swapped_tokens_do_not_collide() {
        // A sequential text replace would turn A1 into A2 and then both A2s into A3.
        assert_eq!(adjust("=A1+A2", (0, 1), (1, 1)), "=A2+A3");
    }

    #[test]
    fn test_strings_are_untouched() {
        assert_eq!(adjust(r#"=CONCAT("A1", A1)"#, (0, 1), (1, 1)), r#"=CONCAT("A1", A2)"#);
    }

    #[test]
    fn test_negative_results_become_ref_errors() {
        assert_eq!(adjust("=A2+B1", (1, 1), (0, 1)), "=A1+#REF!");
        assert_eq!(adjust("=SUM(A1:B2)", (1, 0), (0, 0)), "=SUM(#REF!)");
    }

    #[test]
    fn test_literals_pass_through() {
        assert_eq!(adjust("A1 is text", (0, 0), (5, 5)), "A1 is text");
    }

    #[test]
    fn test_invalid_reference_text_is_an_error() {
        let err = adjust_formula("=A0+1", &CellRef::new(0, 0), &CellRef::new(1, 0)).unwrap_err();
        assert_eq!(err, RefError::InvalidReference("A0".into()));
        let err = adjust_formula("=SUM(A1:B0)", &CellRef::new(0, 0), &CellRef::new(1, 0))
            .unwrap_err();
        assert_eq!(err, RefError::InvalidRange("A1:B0".into()));
    }
}
