//! Writer for the .calc file format

use super::Snapshot;
use crate::error::Result;
use sheetcalc_engine::engine::{is_formula, parse_number};
use std::fs;
use std::path::Path;

/// Write a snapshot to a .calc file
pub fn write_calc(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let content = write_calc_content(snapshot);
    fs::write(path, content)?;
    Ok(())
}

/// Write a snapshot to a .calc format string
pub fn write_calc_content(snapshot: &Snapshot) -> String {
    let mut lines = vec![
        "# Sheetcalc Spreadsheet".to_string(),
        format!("# size: {}x{}", snapshot.rows, snapshot.cols),
    ];

    // Sort cells by position for consistent output
    let mut cells: Vec<_> = snapshot.cells.iter().collect();
    cells.sort_by_key(|(cell, _)| *cell);

    for (cell_ref, input) in cells {
        if input.is_empty() {
            continue;
        }
        lines.push(format!("{}: {}", cell_ref, encode_input(input)));
    }

    lines.join("\n") + "\n"
}

fn encode_input(input: &str) -> String {
    // Formulas go out verbatim unless that would not survive a line-based read.
    if is_formula(input) && !has_line_break(input) && input.trim_end() == input {
        return input.to_string();
    }
    // Only numbers that read back unchanged go out bare.
    if input.trim() == input && parse_number(input).is_some() {
        return input.to_string();
    }
    format!("\"{}\"", escape_calc_text(input))
}

fn has_line_break(input: &str) -> bool {
    input.contains(['\n', '\r'])
}

fn escape_calc_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::parse_calc_content;
    use sheetcalc_engine::engine::CellRef;

    fn snapshot(cells: &[(usize, usize, &str)]) -> Snapshot {
        Snapshot {
            rows: 3,
            cols: 3,
            cells: cells
                .iter()
                .map(|(row, col, input)| (CellRef::new(*row, *col), input.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_write_number() {
        let content = write_calc_content(&snapshot(&[(0, 0, "42")]));
        assert!(content.contains("A1: 42"));
    }

    #[test]
    fn test_write_text() {
        let content = write_calc_content(&snapshot(&[(0, 0, "Hello")]));
        assert!(content.contains("A1: \"Hello\""));
        let content = write_calc_content(&snapshot(&[(0, 0, " 7")]));
        assert!(content.contains("A1: \" 7\""));
    }

    #[test]
    fn test_write_formula() {
        let content = write_calc_content(&snapshot(&[(0, 0, "=B1 + C1")]));
        assert!(content.contains("A1: =B1 + C1"));
    }

    #[test]
    fn test_header_and_size() {
        let content = write_calc_content(&snapshot(&[]));
        assert_eq!(content, "# Sheetcalc Spreadsheet\n# size: 3x3\n");
    }

    #[test]
    fn test_skip_empty_cells() {
        let content = write_calc_content(&snapshot(&[(0, 0, ""), (0, 1, "42")]));
        assert!(!content.contains("A1:"));
        assert!(content.contains("B1: 42"));
    }

    #[test]
    fn test_sorted_output() {
        let content = write_calc_content(&snapshot(&[(1, 1, "3"), (0, 0, "1"), (0, 1, "2")]));
        let lines: Vec<_> = content.lines().collect();
        // After the two header lines: A1, B1, B2
        assert!(lines[2].starts_with("A1"));
        assert!(lines[3].starts_with("B1"));
        assert!(lines[4].starts_with("B2"));
    }

    #[test]
    fn test_line_breaks_are_escaped() {
        let content = write_calc_content(&snapshot(&[(0, 0, "a\nb"), (0, 1, "=CONCAT(\"x\r\ny\")")]));
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains(r#"A1: "a\nb""#));
        assert!(content.contains(r#"B1: "=CONCAT(\"x\r\ny\")""#));

        let parsed = parse_calc_content(&content).unwrap();
        assert_eq!(parsed.cells[0].1, "a\nb");
        assert_eq!(parsed.cells[1].1, "=CONCAT(\"x\r\ny\")");
    }

    #[test]
    fn test_written_content_reads_back() {
        let original = snapshot(&[
            (0, 0, "1.50"),
            (0, 1, r#"say "hi" \o/ \n"#),
            (0, 2, "two\nlines"),
            (1, 0, "=A1*2"),
            (2, 2, "#REF!"),
        ]);
        let parsed = parse_calc_content(&write_calc_content(&original)).unwrap();
        assert_eq!(parsed, original);
    }
}
