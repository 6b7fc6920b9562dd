//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing names are ALL CAPS and matched case-insensitively.
//! - A dotted name (`STDEV.P`) resolves to its underscore form (`STDEV_P`).
//! - Argument counts are checked by the parser against `min_args` /
//!   `max_args`; implementations only check shapes the table cannot express
//!   (e.g. IFS needing pairs).
//! - If you add a built-in, add a row to `BUILTINS`.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;

use crate::engine::criteria::matches_criterion;
use crate::engine::eval::EvalContext;
use crate::engine::format::{Value, coerce_number, parse_number};
use crate::engine::parser::Expr;
use crate::engine::FormulaError;

pub type BuiltinFn = fn(&EvalContext<'_>, &[Expr]) -> Result<Value, FormulaError>;

pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    pub description: &'static str,
    pub eval: BuiltinFn,
}

impl Builtin {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

macro_rules! builtin {
    ($name:literal, $min:expr, $max:expr, $eval:path, $desc:literal) => {
        Builtin {
            name: $name,
            min_args: $min,
            max_args: $max,
            description: $desc,
            eval: $eval,
        }
    };
}

pub const BUILTINS: &[Builtin] = &[
    builtin!("SUM", 0, None, sum, "Sum of all values; non-numbers count as 0"),
    builtin!("AVERAGE", 0, None, average, "Sum divided by the number of values"),
    builtin!("MIN", 0, None, min, "Smallest numeric value"),
    builtin!("MAX", 0, None, max, "Largest numeric value"),
    builtin!("COUNT", 0, None, count, "Number of numeric values"),
    builtin!("COUNTA", 0, None, counta, "Number of values that are not empty or 0"),
    builtin!("COUNTBLANK", 0, None, countblank, "Number of values that are empty or 0"),
    builtin!("COUNTIF", 2, Some(2), countif, "Number of cells matching a criterion"),
    builtin!("COUNTIFS", 2, None, countifs, "Number of rows matching every range/criterion pair"),
    builtin!("SUMIF", 2, Some(3), sumif, "Sum where a range matches a criterion"),
    builtin!("SUMIFS", 3, None, sumifs, "Sum where every range/criterion pair matches"),
    builtin!("AVERAGEIF", 2, Some(3), averageif, "Average where a range matches a criterion"),
    builtin!("AVERAGEIFS", 3, None, averageifs, "Average where every range/criterion pair matches"),
    builtin!("MEDIAN", 0, None, median, "Middle numeric value"),
    builtin!("MODE", 0, None, mode, "Most frequent numeric value"),
    builtin!("STDEV_P", 0, None, stdev_p, "Population standard deviation"),
    builtin!("STDEV_S", 0, None, stdev_s, "Sample standard deviation"),
    builtin!("NPV", 1, None, npv, "Net present value at a discount rate"),
    builtin!("AND", 1, None, and, "TRUE when every condition holds"),
    builtin!("OR", 1, None, or, "TRUE when any condition holds"),
    builtin!("XOR", 1, None, xor, "TRUE when an odd number of conditions hold"),
    builtin!("IF", 3, Some(3), if_, "Choose a value by condition"),
    builtin!("IFS", 2, None, ifs, "Value of the first true condition"),
    builtin!("CONCAT", 0, None, concat, "Join values as text"),
    builtin!("LEFT", 1, Some(2), left, "First n characters (default 1)"),
    builtin!("RIGHT", 1, Some(2), right, "Last n characters (default 1)"),
    builtin!("LOWER", 1, Some(1), lower, "Lowercase text"),
    builtin!("TRIM", 1, Some(1), trim, "Collapse runs of whitespace"),
    builtin!("RAND", 0, Some(0), rand_, "Uniform random number in [0, 1)"),
];

/// Find a built-in by spreadsheet name.
pub fn lookup_builtin(name: &str) -> Option<&'static Builtin> {
    let key = name.to_ascii_uppercase().replace('.', "_");
    BUILTINS.iter().find(|b| b.name == key)
}

/// One `NAME  description` line per built-in, in table order.
pub fn function_help() -> Vec<String> {
    BUILTINS
        .iter()
        .map(|b| format!("{:<12}{}", b.name, b.description))
        .collect()
}

fn numbers(values: &[String]) -> Vec<f64> {
    values.iter().filter_map(|v| parse_number(v)).collect()
}

fn number(n: f64) -> Result<Value, FormulaError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(FormulaError::Num)
    }
}

fn sum(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let values = ctx.flatten(args)?;
    number(values.iter().map(|v| coerce_number(v)).sum())
}

fn average(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let values = ctx.flatten(args)?;
    if values.is_empty() {
        return Ok(Value::Number(0.0));
    }
    let total: f64 = values.iter().map(|v| coerce_number(v)).sum();
    number(total / values.len() as f64)
}

fn min(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let nums = numbers(&ctx.flatten(args)?);
    Ok(Value::Number(nums.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

fn max(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let nums = numbers(&ctx.flatten(args)?);
    Ok(Value::Number(nums.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

fn count(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let n = ctx
        .flatten(args)?
        .iter()
        .filter(|v| parse_number(v).is_some())
        .count();
    Ok(Value::Number(n as f64))
}

fn is_filled(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

fn counta(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let n = ctx.flatten(args)?.iter().filter(|v| is_filled(v)).count();
    Ok(Value::Number(n as f64))
}

fn countblank(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let n = ctx.flatten(args)?.iter().filter(|v| !is_filled(v)).count();
    Ok(Value::Number(n as f64))
}

/// Positions where every (range, criterion) pair matches.
///
/// All ranges must have the same length.
fn matching_positions(ctx: &EvalContext<'_>, pairs: &[Expr]) -> Result<Vec<usize>, FormulaError> {
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(FormulaError::Value);
    }
    let mut tests = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        tests.push((ctx.arg_values(&pair[0])?, ctx.text(&pair[1])?));
    }
    let len = tests[0].0.len();
    if tests.iter().any(|(values, _)| values.len() != len) {
        return Err(FormulaError::Value);
    }
    Ok((0..len)
        .filter(|&i| {
            tests
                .iter()
                .all(|(values, criterion)| matches_criterion(ctx, &values[i], criterion))
        })
        .collect())
}

/// Values at `positions`, read from `target`.
fn pick(
    ctx: &EvalContext<'_>,
    target: &Expr,
    positions: &[usize],
    len: usize,
) -> Result<Vec<f64>, FormulaError> {
    let values = ctx.arg_values(target)?;
    if values.len() != len {
        return Err(FormulaError::Value);
    }
    Ok(positions.iter().map(|&i| coerce_number(&values[i])).collect())
}

fn range_len(ctx: &EvalContext<'_>, arg: &Expr) -> Result<usize, FormulaError> {
    Ok(ctx.arg_values(arg)?.len())
}

fn countif(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Number(matching_positions(ctx, args)?.len() as f64))
}

fn countifs(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    countif(ctx, args)
}

/// SUMIF / AVERAGEIF argument layout: (range, criterion[, target]).
fn single_criterion_matches(
    ctx: &EvalContext<'_>,
    args: &[Expr],
) -> Result<Vec<f64>, FormulaError> {
    let positions = matching_positions(ctx, &args[..2])?;
    let target = args.get(2).unwrap_or(&args[0]);
    pick(ctx, target, &positions, range_len(ctx, &args[0])?)
}

/// SUMIFS / AVERAGEIFS argument layout: (target, range1, crit1, ...).
fn multi_criteria_matches(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Vec<f64>, FormulaError> {
    let positions = matching_positions(ctx, &args[1..])?;
    pick(ctx, &args[0], &positions, range_len(ctx, &args[1])?)
}

fn mean_of_matches(matched: Vec<f64>) -> Result<Value, FormulaError> {
    if matched.is_empty() {
        return Err(FormulaError::DivZero);
    }
    number(matched.iter().sum::<f64>() / matched.len() as f64)
}

fn sumif(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    number(single_criterion_matches(ctx, args)?.iter().sum())
}

fn sumifs(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    number(multi_criteria_matches(ctx, args)?.iter().sum())
}

fn averageif(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    mean_of_matches(single_criterion_matches(ctx, args)?)
}

fn averageifs(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    mean_of_matches(multi_criteria_matches(ctx, args)?)
}

fn median(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let mut nums = numbers(&ctx.flatten(args)?);
    if nums.is_empty() {
        return Err(FormulaError::Num);
    }
    nums.sort_by(f64::total_cmp);
    let mid = nums.len() / 2;
    if nums.len() % 2 == 0 {
        number((nums[mid - 1] + nums[mid]) / 2.0)
    } else {
        number(nums[mid])
    }
}

fn mode(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let nums = numbers(&ctx.flatten(args)?);
    if nums.is_empty() {
        return Err(FormulaError::Num);
    }
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for n in &nums {
        *counts.entry(n.to_bits()).or_default() += 1;
    }
    // First value reaching the highest count wins ties.
    let mut best: Option<(f64, usize)> = None;
    for n in &nums {
        let c = counts[&n.to_bits()];
        if best.is_none_or(|(_, best_count)| c > best_count) {
            best = Some((*n, c));
        }
    }
    match best {
        Some((n, c)) if c > 1 => Ok(Value::Number(n)),
        _ => Err(FormulaError::NotAvailable),
    }
}

fn squared_deviations(nums: &[f64]) -> f64 {
    let mean = nums.iter().sum::<f64>() / nums.len() as f64;
    nums.iter().map(|n| (n - mean).powi(2)).sum()
}

fn stdev_p(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let nums = numbers(&ctx.flatten(args)?);
    if nums.is_empty() {
        return Err(FormulaError::Num);
    }
    number((squared_deviations(&nums) / nums.len() as f64).sqrt())
}

fn stdev_s(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let nums = numbers(&ctx.flatten(args)?);
    if nums.len() < 2 {
        return Err(FormulaError::DivZero);
    }
    number((squared_deviations(&nums) / (nums.len() - 1) as f64).sqrt())
}

fn npv(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let rate = ctx.number(&args[0])?;
    // Non-numeric flows are skipped, so later flows move up a period.
    let flows = numbers(&ctx.flatten(&args[1..])?);
    let total = flows
        .iter()
        .enumerate()
        .map(|(i, v)| v / (1.0 + rate).powi(i as i32 + 1))
        .sum();
    number(total)
}

fn conditions(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Vec<bool>, FormulaError> {
    args.iter().map(|arg| ctx.condition(arg)).collect()
}

fn and(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Bool(conditions(ctx, args)?.into_iter().all(|c| c)))
}

fn or(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Bool(conditions(ctx, args)?.into_iter().any(|c| c)))
}

fn xor(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let trues = conditions(ctx, args)?.into_iter().filter(|c| *c).count();
    Ok(Value::Bool(trues % 2 == 1))
}

fn if_(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    if ctx.condition(&args[0])? {
        ctx.eval(&args[1])
    } else {
        ctx.eval(&args[2])
    }
}

fn ifs(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    if args.len() % 2 != 0 {
        return Err(FormulaError::Value);
    }
    for pair in args.chunks(2) {
        if ctx.condition(&pair[0])? {
            return ctx.eval(&pair[1]);
        }
    }
    Err(FormulaError::NotAvailable)
}

fn concat(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Text(ctx.flatten(args)?.concat()))
}

/// Character count argument for LEFT/RIGHT; negative means none.
fn char_count(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<usize, FormulaError> {
    let n = match args.get(1) {
        Some(arg) => ctx.number(arg)?,
        None => 1.0,
    };
    Ok(if n < 0.0 { 0 } else { n.trunc() as usize })
}

fn left(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let text = ctx.text(&args[0])?;
    let n = char_count(ctx, args)?;
    Ok(Value::Text(text.chars().take(n).collect()))
}

fn right(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let text = ctx.text(&args[0])?;
    let n = char_count(ctx, args)?;
    let skip = text.chars().count().saturating_sub(n);
    Ok(Value::Text(text.chars().skip(skip).collect()))
}

fn lower(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Text(ctx.text(&args[0])?.to_lowercase()))
}

fn trim(ctx: &EvalContext<'_>, args: &[Expr]) -> Result<Value, FormulaError> {
    let text = ctx.text(&args[0])?;
    Ok(Value::Text(
        text.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

fn rand_(_ctx: &EvalContext<'_>, _args: &[Expr]) -> Result<Value, FormulaError> {
    Ok(Value::Number(rand::thread_rng().r#gen()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CellRef, evaluate_formula};

    fn sheet() -> HashMap<CellRef, String> {
        // A: 10 20 30 ""    B: apple pear apple plum    C: 1 2 3 4
        let rows = [
            ("10", "apple", "1"),
            ("20", "pear", "2"),
            ("30", "apple", "3"),
            ("", "plum", "4"),
        ];
        let mut cells = HashMap::new();
        for (r, (a, b, c)) in rows.iter().enumerate() {
            if !a.is_empty() {
                cells.insert(CellRef::new(r, 0), a.to_string());
            }
            cells.insert(CellRef::new(r, 1), b.to_string());
            cells.insert(CellRef::new(r, 2), c.to_string());
        }
        cells
    }

    fn eval(formula: &str) -> String {
        let cells = sheet();
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        evaluate_formula(formula, &CellRef::new(10, 10), &lookup)
    }

    #[test]
    fn test_lookup_builtin() {
        assert_eq!(lookup_builtin("sum").map(|b| b.name), Some("SUM"));
        assert_eq!(lookup_builtin("STDEV.P").map(|b| b.name), Some("STDEV_P"));
        assert!(lookup_builtin("VLOOKUP").is_none());
    }

    #[test]
    fn test_function_help() {
        let help = function_help();
        assert_eq!(help.len(), BUILTINS.len());
        assert_eq!(help[0], "SUM         Sum of all values; non-numbers count as 0");
        assert!(help.iter().any(|line| line.starts_with("STDEV_S ")));
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(eval("=SUM(A1:A4)"), "60");
        assert_eq!(eval("=SUM(A1:A2, 5, B1)"), "35");
        assert_eq!(eval("=AVERAGE(A1:A4)"), "15");
        assert_eq!(eval("=AVERAGE()"), "0");
        assert_eq!(eval("=MIN(A1:B4)"), "10");
        assert_eq!(eval("=MAX(A1:A4)"), "30");
        assert_eq!(eval("=MAX(B1:B4)"), "0");
        assert_eq!(eval("=COUNT(A1:B4)"), "3");
    }

    #[test]
    fn test_counta_and_countblank() {
        assert_eq!(eval("=COUNTA(A1:A4)"), "3");
        assert_eq!(eval("=COUNTBLANK(A1:A4)"), "1");
        assert_eq!(eval("=COUNTA(0, 1)"), "1");
    }

    #[test]
    fn test_conditional_counts_and_sums() {
        assert_eq!(eval(r#"=COUNTIF(B1:B4, "apple")"#), "2");
        assert_eq!(eval(r#"=COUNTIF(A1:A4, ">15")"#), "2");
        assert_eq!(eval(r#"=COUNTIFS(B1:B4, "apple", C1:C4, ">1")"#), "1");
        assert_eq!(eval(r#"=SUMIF(B1:B4, "apple", C1:C4)"#), "4");
        assert_eq!(eval(r#"=SUMIF(C1:C4, ">2")"#), "7");
        assert_eq!(eval(r#"=SUMIFS(C1:C4, B1:B4, "<>apple", C1:C4, ">=2")"#), "6");
        assert_eq!(eval(r#"=AVERAGEIF(B1:B4, "apple", C1:C4)"#), "2");
        assert_eq!(eval(r#"=AVERAGEIFS(A1:A4, C1:C4, "<3")"#), "15");
    }

    #[test]
    fn test_conditional_shape_errors() {
        assert_eq!(eval(r#"=AVERAGEIF(B1:B4, "kiwi", C1:C4)"#), "#DIV/0!");
        assert_eq!(eval(r#"=COUNTIFS(B1:B4, "apple", C1:C2, ">1")"#), "#VALUE!");
        assert_eq!(eval(r#"=COUNTIFS(B1:B4, "apple", C1:C4)"#), "#VALUE!");
        assert_eq!(eval(r#"=SUMIF(B1:B4, "apple", C1:C2)"#), "#VALUE!");
    }

    #[test]
    fn test_statistics() {
        assert_eq!(eval("=MEDIAN(3, 1, 2)"), "2");
        assert_eq!(eval("=MEDIAN(C1:C4)"), "2.5");
        assert_eq!(eval("=MEDIAN(B1:B4)"), "#NUM!");
        assert_eq!(eval("=MODE(1, 2, 2, 3, 3)"), "2");
        assert_eq!(eval("=MODE(1, 2, 3)"), "#N/A");
        assert_eq!(eval("=MODE()"), "#NUM!");
        assert_eq!(eval("=STDEV.P(2, 4, 4, 4, 5, 5, 7, 9)"), "2");
        assert_eq!(eval("=STDEV.S(1, 2, 3, 4)"), "1.2909944487");
        assert_eq!(eval("=STDEV.S(1)"), "#DIV/0!");
        assert_eq!(eval("=STDEV.P()"), "#NUM!");
    }

    #[test]
    fn test_npv() {
        assert_eq!(eval("=NPV(0.1, 110, 121)"), "200");
        assert_eq!(eval(r#"=NPV("x", 1)"#), "#VALUE!");
    }

    #[test]
    fn test_npv_skips_non_numeric_flows() {
        assert_eq!(eval(r#"=NPV(0.1, 110, "n/a", 121)"#), "200");
        // B1:B2 is text, C1:C2 holds 1 and 2.
        assert_eq!(eval("=NPV(0, B1:B2, C1:C2)"), "3");
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval("=AND(A1>5, A2>15)"), "TRUE");
        assert_eq!(eval("=AND(A1>5, A2>25)"), "FALSE");
        assert_eq!(eval("=OR(A1>50, A2>15)"), "TRUE");
        assert_eq!(eval("=XOR(A1>5, A2>15)"), "FALSE");
        assert_eq!(eval("=XOR(A1>5, A2>25)"), "TRUE");
    }

    #[test]
    fn test_if_and_ifs() {
        assert_eq!(eval(r#"=IF(A1>5, "big", "small")"#), "big");
        assert_eq!(eval(r#"=IF(B2="pear", C2*10, 0)"#), "20");
        assert_eq!(eval(r#"=IF(AND(A1>5, A2>5), "both", "no")"#), "both");
        assert_eq!(eval(r#"=IF(A1>5, "ok", 1/0)"#), "ok");
        assert_eq!(eval(r#"=IFS(A1>50, "a", A1>5, "b")"#), "b");
        assert_eq!(eval(r#"=IFS(A1>50, "a")"#), "#N/A");
        assert_eq!(eval(r#"=IFS(A1>50, "a", A1>5)"#), "#VALUE!");
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(eval(r#"=CONCAT("a", B1, 1)"#), "aapple1");
        assert_eq!(eval(r#"=LEFT("hello", 2)"#), "he");
        assert_eq!(eval(r#"=LEFT("hello")"#), "h");
        assert_eq!(eval(r#"=RIGHT("hello", 3)"#), "llo");
        assert_eq!(eval(r#"=RIGHT("hi", -1)"#), "");
        assert_eq!(eval(r#"=RIGHT("hi", 10)"#), "hi");
        assert_eq!(eval(r#"=LOWER("MiXeD")"#), "mixed");
        assert_eq!(eval(r#"=TRIM("  a   b  ")"#), "a b");
    }

    #[test]
    fn test_trim_keeps_embedded_quotes() {
        assert_eq!(eval(r#"=TRIM("""quoted""")"#), "\"quoted\"");
        assert_eq!(eval(r#"=TRIM(" say  ""hi"" ")"#), "say \"hi\"");

        let cells = HashMap::from([(CellRef::new(0, 0), "\"hi\"".to_string())]);
        let lookup = |cell: &CellRef| cells.get(cell).cloned();
        assert_eq!(
            evaluate_formula("=TRIM(A1)", &CellRef::new(1, 0), &lookup),
            "\"hi\""
        );
    }

    #[test]
    fn test_rand_range() {
        let n: f64 = eval("=RAND()").parse().unwrap();
        assert!((0.0..1.0).contains(&n));
    }
}
