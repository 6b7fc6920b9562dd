//! Formula evaluation.
//!
//! [`evaluate`] runs the whole pipeline for one formula:
//!
//! 1. strip the `=` marker
//! 2. expand references ([`expand_references`])
//! 3. tokenize and parse into an AST, resolving function names
//! 4. walk the AST
//!
//! Any failure becomes the cell's value as an error tag; nothing is raised
//! to the caller.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::cell::{FORMULA_MARKER, ValueLookup};
use super::cell_ref::CellRef;
use super::criteria::evaluate_condition;
use super::error::{FormulaError, is_error_tag};
use super::format::Value;
use super::options::{ErrorPolicy, EvalOptions};
use super::parser::{BinaryOp, Expr, UnaryOp, parse_expression};
use super::preprocess::expand_references;

/// Outcome of evaluating one formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Display value: the result, or an error tag.
    pub value: String,
    /// Every cell the formula read, including cells inside ranges.
    pub dependencies: BTreeSet<CellRef>,
    /// The error behind `value`, when evaluation failed.
    pub error: Option<FormulaError>,
}

/// Evaluate `text` for the cell at `cell` with default options.
///
/// Never fails: errors come back as tags such as `#REF!`. Text that is not
/// a formula is returned unchanged.
pub fn evaluate_formula(text: &str, cell: &CellRef, lookup: &impl ValueLookup) -> String {
    evaluate(text, cell, lookup, &EvalOptions::default()).value
}

/// Evaluate `text` and report its dependencies alongside the value.
pub fn evaluate(
    text: &str,
    cell: &CellRef,
    lookup: &impl ValueLookup,
    options: &EvalOptions,
) -> Evaluation {
    let Some(expression) = text.strip_prefix(FORMULA_MARKER) else {
        return Evaluation {
            value: text.to_string(),
            dependencies: BTreeSet::new(),
            error: None,
        };
    };

    let mut dependencies = BTreeSet::new();
    let result = expand_references(expression, lookup, options, &mut dependencies).and_then(
        |expansion| {
            let expr = parse_expression(&expansion.expression)?;
            let ctx = EvalContext {
                ranges: &expansion.ranges,
                lookup,
                options,
            };
            ctx.eval(&expr)
        },
    );

    let (value, error) = match result {
        Ok(value) => (value.to_string(), None),
        Err(e) => (e.tag().to_string(), Some(e)),
    };
    debug!(%cell, formula = text, value = %value, "evaluated");
    Evaluation {
        value,
        dependencies,
        error,
    }
}

/// Everything needed to walk one parsed expression.
pub(crate) struct EvalContext<'a> {
    pub ranges: &'a HashMap<String, Vec<String>>,
    pub lookup: &'a dyn ValueLookup,
    pub options: &'a EvalOptions,
}

impl EvalContext<'_> {
    pub fn eval(&self, expr: &Expr) -> Result<Value, FormulaError> {
        match expr {
            Expr::Number(n) => finite(*n),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Error(e) => Err(*e),
            // A range is only meaningful as a function argument.
            Expr::Range(_) => Err(FormulaError::Value),
            Expr::Group(inner) => self.eval(inner),
            Expr::Unary { op, expr } => {
                let n = self.number(expr)?;
                match op {
                    UnaryOp::Neg => finite(-n),
                    UnaryOp::Plus => finite(n),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Call(call) => (call.builtin.eval)(self, &call.args),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, FormulaError> {
        let l = self.eval(lhs)?;
        let r = self.eval(rhs)?;
        match op {
            BinaryOp::Add => match (l.as_number(), r.as_number()) {
                (Some(a), Some(b)) => finite(a + b),
                _ => Ok(Value::Text(format!("{}{}", l, r))),
            },
            BinaryOp::Sub => finite(to_number(&l)? - to_number(&r)?),
            BinaryOp::Mul => finite(to_number(&l)? * to_number(&r)?),
            BinaryOp::Div => {
                let divisor = to_number(&r)?;
                if divisor == 0.0 {
                    return Err(FormulaError::DivZero);
                }
                finite(to_number(&l)? / divisor)
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                Ok(Value::Bool(compare(op, &l, &r)))
            }
        }
    }

    /// Evaluate to a number; text with no numeric view is `#VALUE!`.
    pub fn number(&self, expr: &Expr) -> Result<f64, FormulaError> {
        to_number(&self.eval(expr)?)
    }

    /// Evaluate to display text.
    pub fn text(&self, expr: &Expr) -> Result<String, FormulaError> {
        Ok(self.eval(expr)?.to_string())
    }

    /// Values collected for a range argument.
    pub fn range_values(&self, range: &str) -> Result<&[String], FormulaError> {
        let values = self.ranges.get(range).ok_or(FormulaError::Ref)?;
        if self.options.error_policy == ErrorPolicy::Propagate {
            if let Some(tag) = values.iter().find(|v| is_error_tag(v)) {
                return Err(FormulaError::from_tag(tag).unwrap_or(FormulaError::Generic));
            }
        }
        Ok(values)
    }

    /// Values of one argument: a range's cells, or a single evaluated value.
    pub fn arg_values(&self, arg: &Expr) -> Result<Vec<String>, FormulaError> {
        match arg {
            Expr::Range(range) => Ok(self.range_values(range)?.to_vec()),
            other => Ok(vec![self.text(other)?]),
        }
    }

    /// Values of all arguments, ranges expanded in place.
    pub fn flatten(&self, args: &[Expr]) -> Result<Vec<String>, FormulaError> {
        let mut out = Vec::new();
        for arg in args {
            out.extend(self.arg_values(arg)?);
        }
        Ok(out)
    }

    /// Truth of a condition argument.
    pub fn condition(&self, expr: &Expr) -> Result<bool, FormulaError> {
        let text = self.render(expr)?;
        Ok(evaluate_condition(self, &text))
    }

    /// Render an expression back to condition text. Nested calls are
    /// replaced by the literal of their result.
    pub fn render(&self, expr: &Expr) -> Result<String, FormulaError> {
        Ok(match expr {
            Expr::Error(e) => return Err(*e),
            Expr::Range(_) => return Err(FormulaError::Value),
            Expr::Call(_) => self.eval(expr)?.to_literal(),
            Expr::Group(inner) => format!("({})", self.render(inner)?),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => format!("-{}", self.render(expr)?),
                UnaryOp::Plus => format!("+{}", self.render(expr)?),
            },
            Expr::Binary { op, lhs, rhs } => {
                format!("{}{}{}", self.render(lhs)?, op.symbol(), self.render(rhs)?)
            }
            literal => literal.to_string(),
        })
    }

    /// Evaluate free-standing expression text in this context.
    pub fn eval_text(&self, text: &str) -> Result<Value, FormulaError> {
        self.eval(&parse_expression(text)?)
    }
}

fn finite(n: f64) -> Result<Value, FormulaError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(FormulaError::Num)
    }
}

fn to_number(value: &Value) -> Result<f64, FormulaError> {
    value.as_number().ok_or(FormulaError::Value)
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (l.as_number(), r.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(l.to_string().cmp(&r.to_string())),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(values: &[(&str, &str)]) -> HashMap<CellRef, String> {
        values
            .iter()
            .map(|(r, v)| (CellRef::from_str(r).unwrap(), v.to_string()))
            .collect()
    }

    fn eval_in(formula: &str, cells: &HashMap<CellRef, String>) -> String {
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        evaluate_formula(formula, &CellRef::new(9, 9), &lookup)
    }

    fn eval(formula: &str) -> String {
        eval_in(formula, &HashMap::new())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1+2*3"), "7");
        assert_eq!(eval("=(1+2)*3"), "9");
        assert_eq!(eval("=-2*-3"), "6");
        assert_eq!(eval("=7/2"), "3.5");
        assert_eq!(eval("=0.1+0.2"), "0.3");
    }

    #[test]
    fn test_references() {
        let cells = sheet(&[("A1", "10"), ("A2", "20")]);
        assert_eq!(eval_in("=A1+A2", &cells), "30");
        assert_eq!(eval_in("=A1-A3", &cells), "10");
    }

    #[test]
    fn test_text_concatenation_and_comparison() {
        let cells = sheet(&[("A1", "foo")]);
        assert_eq!(eval_in(r#"=A1+"bar""#, &cells), "foobar");
        assert_eq!(eval_in(r#"=A1="foo""#, &cells), "TRUE");
        assert_eq!(eval("=3>4"), "FALSE");
        assert_eq!(eval_in("=A1*2", &cells), "#VALUE!");
    }

    #[test]
    fn test_error_tags() {
        assert_eq!(eval("=1/0"), "#DIV/0!");
        assert_eq!(eval("=Z-1"), "#ERROR!");
        assert_eq!(eval("=A0+1"), "#REF!");
        assert_eq!(eval("=FOO(1)"), "#NAME?");
        assert_eq!(eval("=IF(1)"), "#VALUE!");
        assert_eq!(eval("=1+"), "#ERROR!");
        assert_eq!(eval("="), "#ERROR!");
        assert_eq!(eval("=A1:B2"), "#VALUE!");
    }

    #[test]
    fn test_literal_pass_through() {
        assert_eq!(eval("hello"), "hello");
        assert_eq!(eval("42"), "42");
    }

    #[test]
    fn test_dependencies_are_reported() {
        let cells = sheet(&[("A1", "1")]);
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        let result = evaluate(
            "=A1+SUM(B1:B2)",
            &CellRef::new(5, 5),
            &lookup,
            &EvalOptions::default(),
        );
        assert_eq!(result.value, "1");
        let deps: Vec<String> = result.dependencies.iter().map(|c| c.to_string()).collect();
        assert_eq!(deps, vec!["A1", "B1", "B2"]);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_dependencies_survive_errors() {
        let lookup = |_: &CellRef| None;
        let result = evaluate("=A1/B1", &CellRef::new(5, 5), &lookup, &EvalOptions::default());
        assert_eq!(result.error, Some(FormulaError::DivZero));
        assert_eq!(result.dependencies.len(), 2);
    }

    #[test]
    fn test_error_policy() {
        let cells = sheet(&[("A1", "#N/A")]);
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        let coerce = evaluate("=A1+1", &CellRef::new(1, 0), &lookup, &EvalOptions::default());
        assert_eq!(coerce.value, "1");

        let options = EvalOptions {
            error_policy: ErrorPolicy::Propagate,
            ..EvalOptions::default()
        };
        let propagate = evaluate("=A1+1", &CellRef::new(1, 0), &lookup, &options);
        assert_eq!(propagate.value, "#N/A");
        let ranged = evaluate("=SUM(A1:A2)", &CellRef::new(3, 0), &lookup, &options);
        assert_eq!(ranged.value, "#N/A");
    }
}
