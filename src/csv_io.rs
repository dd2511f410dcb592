//! # CSV import/export
//!
//! Hand-rolled CSV handling for the four base relations (`N`, `E`, `NP`,
//! `EP`), matching the surface protocol's `import N|E|NP|EP from "<path>"`
//! command. Kept independent of any CSV crate, in the same spirit as the
//! rest of the surface parser: small, line-oriented scanning rather than
//! pulling in a dependency for a format this constrained. Supports
//! RFC4180-style double-quote escaping (`""` inside a quoted field) and an
//! optional header row (detected by comparing the first row's arity and
//! content against the expected column names, not guessed).

use crate::error::{GraphViewError, Result};

/// One parsed CSV row, already unescaped.
pub type Row = Vec<String>;

/// Split CSV text into unescaped rows. Accepts both `\n` and `\r\n` line
/// endings; a trailing blank line is ignored.
///
/// # Errors
/// Returns [`GraphViewError::ParseError`] if a quoted field is never closed.
pub fn parse_csv(contents: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let chars: Vec<char> = contents.chars().collect();
    let mut pos = 0;
    let mut row = Row::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut saw_any_field_this_row = false;

    while pos < chars.len() {
        let c = chars[pos];
        if in_quotes {
            if c == '"' {
                if chars.get(pos + 1) == Some(&'"') {
                    field.push('"');
                    pos += 2;
                    continue;
                }
                in_quotes = false;
                pos += 1;
            } else {
                field.push(c);
                pos += 1;
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                pos += 1;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                saw_any_field_this_row = true;
                pos += 1;
            }
            '\r' => {
                pos += 1;
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                saw_any_field_this_row = false;
                pos += 1;
            }
            _ => {
                field.push(c);
                saw_any_field_this_row = true;
                pos += 1;
            }
        }
    }
    if in_quotes {
        return Err(GraphViewError::ParseError { pos, msg: "unterminated quoted CSV field".to_string() });
    }
    if saw_any_field_this_row || !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

/// Drop a leading header row if it matches `expected_columns` case-insensitively.
#[must_use]
pub fn strip_known_header<'a>(rows: &'a [Row], expected_columns: &[&str]) -> &'a [Row] {
    if let Some(first) = rows.first() {
        if first.len() == expected_columns.len()
            && first
                .iter()
                .zip(expected_columns)
                .all(|(cell, expected)| cell.eq_ignore_ascii_case(expected))
        {
            return &rows[1..];
        }
    }
    rows
}

/// Column names for each base relation, in positional order.
pub const NODE_COLUMNS: [&str; 2] = ["id", "label"];
pub const EDGE_COLUMNS: [&str; 4] = ["id", "src", "dst", "label"];
pub const NODE_PROP_COLUMNS: [&str; 3] = ["node_id", "key", "value"];
pub const EDGE_PROP_COLUMNS: [&str; 3] = ["edge_id", "key", "value"];

/// Quote a field for CSV output only if it needs it (contains a comma,
/// quote, or newline).
#[must_use]
pub fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows (with a header) as CSV text.
#[must_use]
pub fn write_csv(header: &[&str], rows: &[Row]) -> String {
    let mut out = String::new();
    out.push_str(&header.iter().map(|h| quote_field(h)).collect::<Vec<_>>().join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|f| quote_field(f)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}
