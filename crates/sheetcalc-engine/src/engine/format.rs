//! Scalar values and their display form.

use std::fmt;

/// A scalar produced while evaluating a formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Numeric view: numbers as-is, booleans as 1/0, numeric text parsed,
    /// empty text as 0. Other text has no numeric view.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) if s.trim().is_empty() => Some(0.0),
            Value::Text(s) => parse_number(s),
        }
    }

    /// Render as a literal that the tokenizer reads back to the same value.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Text(s) => quote_text(s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Parse a cell value as a finite number.
///
/// Only plain decimal notation is accepted (`12`, `-3.5`, `.5`, `1e3`);
/// words Rust would otherwise parse (`inf`, `NaN`) are not numbers here.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let looks_numeric = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && text.chars().any(|c| c.is_ascii_digit());
    if !looks_numeric {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric coercion used by aggregates: anything unparseable counts as 0.
pub fn coerce_number(text: &str) -> f64 {
    parse_number(text).unwrap_or(0.0)
}

/// Format a number for display.
///
/// Integral values print without a fraction; others are rounded to ten
/// decimal places to hide binary floating point noise.
pub fn format_number(n: f64) -> String {
    // Normalize negative zero.
    let n = if n == 0.0 { 0.0 } else { n };
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{:.0}", n);
    }
    let rounded = (n * 1e10).round() / 1e10;
    if rounded.is_finite() && rounded != 0.0 {
        rounded.to_string()
    } else {
        n.to_string()
    }
}

/// Quote text as a formula string literal, doubling embedded quotes.
pub fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Strip one layer of surrounding quotes and un-double embedded quotes.
/// Text without surrounding quotes is returned trimmed but otherwise as-is.
pub fn unquote_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}
