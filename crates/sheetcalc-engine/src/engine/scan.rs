//! Reference token scanning shared by expansion, adjustment and conditions.
//!
//! A reference token is `[A-Z]+[0-9]+` optionally followed by
//! `:[A-Z]+[0-9]+`. Tokens inside string literals are never touched;
//! formula strings escape quotes by doubling them, so toggling on every `"`
//! tracks string boundaries correctly.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Matches single-cell and range reference tokens.
///
/// Captures:
/// - group 1: first (or only) cell reference
/// - group 2: second corner, for ranges
pub fn reference_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z]+[0-9]+)(?::([A-Z]+[0-9]+))?\b")
            .expect("reference token regex must compile")
    })
}

/// Matches single-cell reference tokens only.
pub fn cell_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]+[0-9]+\b").expect("cell token regex must compile"))
}

/// Apply `replace` to every segment of `text` that lies outside string
/// literals; string literals (with their quotes) are copied unchanged.
pub fn map_outside_strings<E>(
    text: &str,
    mut replace: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut seg_start = 0;
    let mut in_string = false;

    for (i, ch) in text.char_indices() {
        if ch != '"' {
            continue;
        }
        if in_string {
            out.push_str(&text[seg_start..=i]);
            seg_start = i + 1;
        } else {
            out.push_str(&replace(&text[seg_start..i])?);
            seg_start = i;
        }
        in_string = !in_string;
    }

    if seg_start < text.len() {
        if in_string {
            out.push_str(&text[seg_start..]);
        } else {
            out.push_str(&replace(&text[seg_start..])?);
        }
    }

    Ok(out)
}

/// Replace every match of `re` in `segment`, letting the replacement fail.
pub fn try_replace_all<E>(
    re: &Regex,
    segment: &str,
    mut replace: impl FnMut(&Captures) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;
    for caps in re.captures_iter(segment) {
        let whole = caps.get_match();
        out.push_str(&segment[last..whole.start()]);
        out.push_str(&replace(&caps)?);
        last = whole.end();
    }
    out.push_str(&segment[last..]);
    Ok(out)
}

/// Byte offset of the first `needle` outside string literals.
pub fn find_outside_strings(text: &str, needle: &str) -> Option<usize> {
    let mut in_string = false;
    for (i, ch) in text.char_indices() {
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if !in_string && text[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}
