//! In-place re-alignment of an existing dump
//!
//! Unlike [`serialize`](crate::serialize::serialize), this pass never
//! rebuilds the file. It finds each `"columns"` line that is directly
//! followed by `"rows": [`, re-pads the header and the row lines of that
//! block, and copies every other line through byte-for-byte. Row lines keep
//! their own indentation; the spaces after `[` are recomputed from the
//! actual header and row indents.

use tracing::{debug, warn};

use crate::error::FormatIssue;
use crate::serialize::{
    column_widths, render_columns_line, render_row_line, AlignmentPolicy, Cell,
};
use crate::tokenize::{tokenize_row, RowLine};
use crate::value::Value;

/// Output of [`realign`]
#[derive(Debug, Clone, Default)]
pub struct Realigned {
    pub text: String,
    pub issues: Vec<FormatIssue>,
    /// Number of `columns`/`rows` blocks that were rewritten
    pub blocks_aligned: usize,
}

/// Re-pad every `columns`/`rows` block of `text`
pub fn realign(text: &str, policy: &AlignmentPolicy) -> Realigned {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut result = Realigned {
        text: String::with_capacity(text.len()),
        ..Realigned::default()
    };

    let mut i = 0;
    while i < lines.len() {
        match align_block(&lines, i, policy, &mut result) {
            Some(next) => {
                result.blocks_aligned += 1;
                i = next;
            }
            None => {
                result.text.push_str(lines[i]);
                i += 1;
            }
        }
    }

    debug!(blocks = result.blocks_aligned, "realign finished");
    result
}

/// Rewrite the block whose header is `lines[at]`.
///
/// Returns the index of the first line after the block, or `None` when the
/// line does not start an alignable block (nothing is written in that case).
fn align_block(
    lines: &[&str],
    at: usize,
    policy: &AlignmentPolicy,
    out: &mut Realigned,
) -> Option<usize> {
    let header = lines[at];
    let (header_indent, columns_json) = split_columns_line(header)?;

    let columns = match serde_json::from_str::<Vec<String>>(columns_json) {
        Ok(columns) => columns,
        Err(e) => {
            let message = format!("columns line left as is: {}", e);
            warn!(line = at + 1, "{}", message);
            out.issues.push(FormatIssue::new(at + 1, message));
            return None;
        }
    };

    let rows_marker = at + 1;
    if lines.get(rows_marker).map(|l| l.trim()) != Some("\"rows\": [") {
        return None;
    }

    let mut rows: Vec<RowLine> = Vec::new();
    let mut end = rows_marker + 1;
    while let Some(line) = lines.get(end) {
        if !line.trim_start().starts_with('[') {
            break;
        }
        match tokenize_row(line) {
            Some(row) => rows.push(row),
            None => break,
        }
        end += 1;
    }
    if rows.is_empty() {
        return None;
    }

    let squeeze = policy
        .squeeze_column
        .as_deref()
        .and_then(|name| columns.iter().position(|c| c == name));

    let cells: Vec<Vec<Cell>> = rows
        .iter()
        .enumerate()
        .map(|(k, row)| {
            row.tokens
                .iter()
                .enumerate()
                .map(|(col, token)| to_cell(token, squeeze == Some(col), rows_marker + k + 2, out))
                .collect()
        })
        .collect();

    let widths = column_widths(&columns, &cells, policy.pad_columns);
    let prefix = policy.row_prefix_spaces(header_indent.len(), rows[0].indent.len());

    out.text.push_str(&render_columns_line(header_indent, &columns, &widths));
    out.text.push_str(line_ending(header));
    out.text.push_str(lines[rows_marker]);
    for (k, (row, row_cells)) in rows.iter().zip(&cells).enumerate() {
        out.text.push_str(&render_row_line(
            &row.indent,
            prefix,
            row_cells,
            &widths,
            row.trailing_comma,
        ));
        out.text.push_str(line_ending(lines[rows_marker + 1 + k]));
    }

    Some(end)
}

fn to_cell(token: &str, squeeze: bool, line: usize, out: &mut Realigned) -> Cell {
    match Value::parse_literal(token) {
        Ok(Value::String(s)) if squeeze => Cell::Literal(Value::String(squeeze_spaces(&s))),
        Ok(value) => Cell::Literal(value),
        Err(e) => {
            let message = format!("cell kept verbatim: {}", e);
            warn!(line, "{}", message);
            out.issues.push(FormatIssue::new(line, message));
            Cell::Raw(token.to_string())
        }
    }
}

/// `<indent>"columns": [...],` → (indent, `[...]`)
fn split_columns_line(line: &str) -> Option<(&str, &str)> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let rest = body.strip_prefix("\"columns\":")?.trim();
    let rest = rest.strip_suffix(',').map_or(rest, str::trim_end);
    Some((indent, rest))
}

/// Collapse whitespace runs to single spaces and trim the ends
pub fn squeeze_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
