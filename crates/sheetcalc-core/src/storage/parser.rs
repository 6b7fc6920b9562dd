//! Parser for the .calc file format

use super::Snapshot;
use crate::error::{Result, SheetError};
use sheetcalc_engine::engine::{CellRef, is_formula, parse_number};
use std::fs;
use std::path::Path;

/// Parse a .calc file into a snapshot
pub fn parse_calc(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path)?;
    parse_calc_content(&content)
}

/// Parse .calc content from a string
pub fn parse_calc_content(content: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        if let Some(comment) = line.strip_prefix('#') {
            if let Some(size) = comment.trim().strip_prefix("size:") {
                let (rows, cols) = parse_size(size.trim(), line_num + 1)?;
                snapshot.rows = rows;
                snapshot.cols = cols;
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        // Parse "CELLREF: VALUE" format
        let Some((cell_ref_str, value_str)) = line.split_once(':') else {
            return Err(SheetError::Parse {
                line: line_num + 1,
                message: "Expected 'CELLREF: VALUE' format".to_string(),
            });
        };

        let cell_ref_str = cell_ref_str.trim();
        let cell_ref = CellRef::from_str(cell_ref_str).ok_or_else(|| SheetError::Parse {
            line: line_num + 1,
            message: format!("Invalid cell reference: {}", cell_ref_str),
        })?;

        let Some(input) = parse_cell_input(value_str.trim(), line_num + 1)? else {
            continue;
        };
        snapshot.rows = snapshot.rows.max(cell_ref.row + 1);
        snapshot.cols = snapshot.cols.max(cell_ref.col + 1);
        snapshot.cells.push((cell_ref, input));
    }

    snapshot.cells.sort_by_key(|(cell, _)| *cell);
    Ok(snapshot)
}

fn parse_size(size: &str, line_num: usize) -> Result<(usize, usize)> {
    let invalid = || SheetError::Parse {
        line: line_num,
        message: format!("Invalid size: {}. Expected <rows>x<cols>.", size),
    };
    let (rows, cols) = size.split_once('x').ok_or_else(invalid)?;
    let rows = rows.trim().parse().map_err(|_| invalid())?;
    let cols = cols.trim().parse().map_err(|_| invalid())?;
    Ok((rows, cols))
}

/// Raw input for one cell; `None` for an empty value.
fn parse_cell_input(value: &str, line_num: usize) -> Result<Option<String>> {
    if value.is_empty() {
        return Ok(None);
    }

    if is_formula(value) {
        return Ok(Some(value.to_string()));
    }

    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let text = &value[1..value.len() - 1];
        return Ok(Some(unescape_calc_text(text)));
    }

    // Numbers keep their written form.
    if parse_number(value).is_some() {
        return Ok(Some(value.to_string()));
    }

    Err(SheetError::Parse {
        line: line_num,
        message: format!("Invalid value: {}. Use quotes for text.", value),
    })
}

fn unescape_calc_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
