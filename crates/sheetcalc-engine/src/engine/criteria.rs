//! Condition grammar shared by IF/IFS/AND/OR/XOR and the *IF(S) family.
//!
//! A condition is text such as `10>5`, `"a"="a"` or `"7">=B1`. It is
//! evaluated in three steps:
//!
//! 1. sanitize: `<>` becomes `!=`, and every cell reference outside string
//!    literals is replaced by its quoted current value
//! 2. split once on the first operator found, trying `>=`, `<=`, `!=`, `=`,
//!    `>`, `<` in that order
//! 3. compare: ordering operators compare numerically (non-numbers are
//!    false), `=` and `!=` compare numbers when both sides are numeric and
//!    text otherwise
//!
//! Without an operator only a bare `TRUE` is true.

use std::convert::Infallible;

use super::cell::ValueLookup;
use super::cell_ref::CellRef;
use super::eval::EvalContext;
use super::format::{parse_number, quote_text, unquote_text};
use super::scan::{cell_token_re, find_outside_strings, map_outside_strings};

const OPERATORS: [&str; 6] = [">=", "<=", "!=", "=", ">", "<"];

/// Operator prefixes recognised at the start of a COUNTIF-style criterion.
const CRITERION_PREFIXES: [&str; 7] = [">=", "<=", "<>", "!=", "=", ">", "<"];

/// Replace `<>` with `!=` and inline referenced values as quoted text.
pub fn sanitize_condition(condition: &str, lookup: &dyn ValueLookup) -> String {
    let re = cell_token_re();
    map_outside_strings(condition, |segment| {
        let segment = segment.replace("<>", "!=");
        Ok::<_, Infallible>(
            re.replace_all(&segment, |caps: &regex::Captures| {
                let value = CellRef::from_str(&caps[0])
                    .and_then(|cell| lookup.lookup(&cell))
                    .unwrap_or_default();
                quote_text(&value)
            })
            .into_owned(),
        )
    })
    .unwrap_or_else(|never| match never {})
}

pub(crate) fn evaluate_condition(ctx: &EvalContext<'_>, condition: &str) -> bool {
    let sanitized = sanitize_condition(condition, ctx.lookup);

    let split = OPERATORS.iter().find_map(|op| {
        find_outside_strings(&sanitized, op).map(|at| {
            (
                *op,
                &sanitized[..at],
                &sanitized[at + op.len()..],
            )
        })
    });

    let Some((op, lhs, rhs)) = split else {
        return unquote_text(&sanitized).eq_ignore_ascii_case("TRUE");
    };

    let left = operand(ctx, lhs);
    let right = operand(ctx, rhs);
    match op {
        "=" => loose_eq(&left, &right),
        "!=" => !loose_eq(&left, &right),
        _ => {
            let (Some(a), Some(b)) = (parse_number(&left), parse_number(&right)) else {
                return false;
            };
            match op {
                ">=" => a >= b,
                "<=" => a <= b,
                ">" => a > b,
                "<" => a < b,
                _ => false,
            }
        }
    }
}

/// Resolve one side of a comparison to plain text.
fn operand(ctx: &EvalContext<'_>, raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return unquote_text(raw);
    }
    if let Some(cell) = CellRef::from_str(raw) {
        return ctx.lookup.lookup(&cell).unwrap_or_default();
    }
    if raw.is_empty() || parse_number(raw).is_some() {
        return raw.to_string();
    }
    // Arithmetic such as `5*2`; anything unparseable compares as written.
    ctx.eval_text(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn loose_eq(a: &str, b: &str) -> bool {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Build the condition testing `value` against a COUNTIF-style criterion.
///
/// `">5"` tests `"value">5`; a criterion without a leading operator is an
/// equality test against the whole criterion.
pub fn criterion_condition(value: &str, criterion: &str) -> String {
    let criterion = criterion.trim();
    if CRITERION_PREFIXES.iter().any(|p| criterion.starts_with(p)) {
        format!("{}{}", quote_text(value), criterion)
    } else {
        format!("{}={}", quote_text(value), quote_text(criterion))
    }
}

/// True when `value` satisfies `criterion`.
pub(crate) fn matches_criterion(ctx: &EvalContext<'_>, value: &str, criterion: &str) -> bool {
    evaluate_condition(ctx, &criterion_condition(value, criterion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::EvalOptions;
    use std::collections::HashMap;

    fn with_ctx<R>(cells: &[(&str, &str)], f: impl FnOnce(&EvalContext<'_>) -> R) -> R {
        let cells: HashMap<CellRef, String> = cells
            .iter()
            .map(|(r, v)| (CellRef::from_str(r).unwrap(), v.to_string()))
            .collect();
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        let ranges = HashMap::new();
        let options = EvalOptions::default();
        let ctx = EvalContext {
            ranges: &ranges,
            lookup: &lookup,
            options: &options,
        };
        f(&ctx)
    }

    #[test]
    fn test_sanitize() {
        with_ctx(&[("A1", "7")], |ctx| {
            assert_eq!(sanitize_condition("A1<>3", ctx.lookup), r#""7"!=3"#);
            assert_eq!(sanitize_condition(r#""A1"=A1"#, ctx.lookup), r#""A1"="7""#);
        });
    }

    #[test]
    fn test_numeric_comparisons() {
        with_ctx(&[], |ctx| {
            assert!(evaluate_condition(ctx, "10>5"));
            assert!(!evaluate_condition(ctx, "10<5"));
            assert!(evaluate_condition(ctx, "5>=5"));
            assert!(evaluate_condition(ctx, "4<=5"));
            assert!(evaluate_condition(ctx, "5*2>9"));
            assert!(!evaluate_condition(ctx, r#""abc">1"#));
        });
    }

    #[test]
    fn test_equality_is_loose() {
        with_ctx(&[], |ctx| {
            assert!(evaluate_condition(ctx, r#""5"=5.0"#));
            assert!(evaluate_condition(ctx, r#""apple"="apple""#));
            assert!(evaluate_condition(ctx, r#""apple"<>"pear""#));
            assert!(!evaluate_condition(ctx, r#""a=b"="a""#));
        });
    }

    #[test]
    fn test_references_are_resolved() {
        with_ctx(&[("B1", "3")], |ctx| {
            assert!(evaluate_condition(ctx, "B1>2"));
            assert!(evaluate_condition(ctx, "4>B1"));
        });
    }

    #[test]
    fn test_no_operator() {
        with_ctx(&[], |ctx| {
            assert!(evaluate_condition(ctx, "TRUE"));
            assert!(!evaluate_condition(ctx, "FALSE"));
            assert!(!evaluate_condition(ctx, "1"));
            assert!(!evaluate_condition(ctx, ""));
        });
    }

    #[test]
    fn test_criteria() {
        assert_eq!(criterion_condition("12", ">10"), r#""12">10"#);
        assert_eq!(criterion_condition("x", "apple"), r#""x"="apple""#);
        with_ctx(&[("C1", "20")], |ctx| {
            assert!(matches_criterion(ctx, "12", ">10"));
            assert!(!matches_criterion(ctx, "12", ">C1"));
            assert!(matches_criterion(ctx, "apple", "apple"));
            assert!(matches_criterion(ctx, "3", "<>4"));
            assert!(matches_criterion(ctx, "5", "5"));
        });
    }
}
