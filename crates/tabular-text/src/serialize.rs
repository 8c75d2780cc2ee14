//! Column-aligned writer
//!
//! Every column gets one width: the widest printed form among its quoted
//! header and all of its cells. Padding then goes on a side that depends on
//! what is being padded:
//!
//! - header names: after the closing quote
//! - string cells: inside the quotes, before the closing quote
//! - numbers, booleans, null: before the literal
//!
//! Rows open with enough spaces after `[` that their first cell starts in
//! the same text column as the first header name after `"columns": [`.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::table::{Table, TableBody};
use crate::value::{quote, PadSide, Value};

/// Text in front of the first header name
pub const COLUMNS_PREFIX: &str = "\"columns\": [";
/// Text in front of the first cell of a row
pub const ROW_PREFIX: &str = "[";

/// How tables are laid out on write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentPolicy {
    /// Pad every column to a common width
    pub pad_columns: bool,
    /// Indentation of `"<table>": {` lines
    pub table_indent: usize,
    /// Indentation of `"columns"` / `"rows"` lines
    pub header_indent: usize,
    /// Indentation of row lines
    pub row_indent: usize,
    /// String column whose internal whitespace runs are collapsed on re-align
    pub squeeze_column: Option<String>,
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self {
            pad_columns: true,
            table_indent: 2,
            header_indent: 4,
            row_indent: 6,
            squeeze_column: Some("ParameterDescription".to_string()),
        }
    }
}

impl AlignmentPolicy {
    /// No padding, single spaces; handy for diffs of content only
    pub fn compact() -> Self {
        Self {
            pad_columns: false,
            squeeze_column: None,
            ..Self::default()
        }
    }

    /// Spaces after `[` so the first cell sits under the first header name
    pub fn row_prefix_spaces(&self, header_indent: usize, row_indent: usize) -> usize {
        if !self.pad_columns {
            return 1;
        }
        let header_start = header_indent + COLUMNS_PREFIX.len();
        let row_start = row_indent + ROW_PREFIX.len();
        if header_start < row_start {
            1
        } else {
            header_start - row_start
        }
    }
}

// ============================================================================
// Cells
// ============================================================================

/// A cell as seen by the aligner
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    /// A readable literal
    Literal(Value),
    /// A token that is not a valid literal; kept verbatim, padded after
    Raw(String),
}

impl Cell {
    fn printed(&self) -> String {
        match self {
            Cell::Literal(v) => v.literal(),
            Cell::Raw(raw) => raw.clone(),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.printed().chars().count()
    }

    pub(crate) fn render(&self, width: usize) -> String {
        let printed = self.printed();
        let pad = " ".repeat(width.saturating_sub(printed.chars().count()));
        match self {
            Cell::Literal(v) => match v.pad_side() {
                PadSide::InsideQuotes => {
                    // printed ends with the closing quote
                    let body = &printed[..printed.len() - 1];
                    format!("{body}{pad}\"")
                }
                PadSide::Before => format!("{pad}{printed}"),
            },
            Cell::Raw(_) => format!("{printed}{pad}"),
        }
    }
}

/// Printed width of a cell missing from a short row
const MISSING_CELL_WIDTH: usize = 4; // "null"

/// Per-column widths over the header and every row
pub(crate) fn column_widths(columns: &[String], rows: &[Vec<Cell>], pad: bool) -> Vec<usize> {
    let count = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(columns.len()))
        .max()
        .unwrap_or(0);
    if !pad {
        return vec![0; count];
    }

    let mut widths: Vec<usize> = (0..count)
        .map(|i| columns.get(i).map_or(0, |c| quote(c).chars().count()))
        .collect();
    for row in rows {
        for (i, width) in widths.iter_mut().enumerate() {
            let cell_width = row.get(i).map_or(MISSING_CELL_WIDTH, Cell::width);
            *width = (*width).max(cell_width);
        }
    }
    widths
}

/// `<indent>"columns": ["a"   , "b"],`
pub(crate) fn render_columns_line(indent: &str, columns: &[String], widths: &[usize]) -> String {
    let names: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let quoted = quote(name);
            let width = widths.get(i).copied().unwrap_or(0);
            let pad = width.saturating_sub(quoted.chars().count());
            format!("{quoted}{}", " ".repeat(pad))
        })
        .collect();
    format!("{indent}{COLUMNS_PREFIX}{}],", names.join(", "))
}

/// `<indent>[<prefix>cell, cell ]<comma>`
pub(crate) fn render_row_line(
    indent: &str,
    prefix_spaces: usize,
    cells: &[Cell],
    widths: &[usize],
    trailing_comma: bool,
) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| cell.render(widths.get(i).copied().unwrap_or(0)))
        .collect();
    format!(
        "{indent}{ROW_PREFIX}{}{} ]{}",
        " ".repeat(prefix_spaces),
        rendered.join(", "),
        if trailing_comma { "," } else { "" }
    )
}

// ============================================================================
// Document writer
// ============================================================================

/// Write a whole document in the dump format
pub fn serialize(doc: &Document, policy: &AlignmentPolicy) -> String {
    let mut lines: Vec<String> = vec!["{".to_string()];
    let last = doc.len().saturating_sub(1);

    for (i, table) in doc.tables().iter().enumerate() {
        write_table(&mut lines, table, policy);
        let tail = if i < last { "," } else { "" };
        lines.push(format!("{}}}{tail}", " ".repeat(policy.table_indent)));
    }

    lines.push("}".to_string());
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn write_table(lines: &mut Vec<String>, table: &Table, policy: &AlignmentPolicy) {
    let table_indent = " ".repeat(policy.table_indent);
    let header_indent = " ".repeat(policy.header_indent);
    let row_indent = " ".repeat(policy.row_indent);

    lines.push(format!("{table_indent}{}: {{", quote(&table.name)));

    match &table.body {
        TableBody::Rows(rows) => {
            let cells: Vec<Vec<Cell>> = rows
                .iter()
                .map(|row| row.iter().cloned().map(Cell::Literal).collect())
                .collect();
            let widths = column_widths(&table.columns, &cells, policy.pad_columns);
            lines.push(render_columns_line(&header_indent, &table.columns, &widths));

            if cells.is_empty() {
                lines.push(format!("{header_indent}\"rows\": []"));
                return;
            }

            lines.push(format!("{header_indent}\"rows\": ["));
            let prefix = policy.row_prefix_spaces(policy.header_indent, policy.row_indent);
            let last = cells.len() - 1;
            for (k, row) in cells.iter().enumerate() {
                lines.push(render_row_line(&row_indent, prefix, row, &widths, k < last));
            }
            lines.push(format!("{header_indent}]"));
        }
        TableBody::Data(entries) => {
            let widths = column_widths(&table.columns, &[], policy.pad_columns);
            lines.push(render_columns_line(&header_indent, &table.columns, &widths));
            lines.push(format!("{header_indent}\"data\": {{"));
            let last = entries.len().saturating_sub(1);
            for (k, (key, value)) in entries.iter().enumerate() {
                let comma = if k < last { "," } else { "" };
                lines.push(format!("{row_indent}{}: {}{comma}", quote(key), value.literal()));
            }
            lines.push(format!("{header_indent}}}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.insert(Table::with_rows(
            "DevVarTypes",
            vec!["Variable_type".into(), "Size".into()],
            vec![
                vec![Value::string("tint8u"), Value::Int(1)],
                vec![Value::string("tfloat"), Value::Null],
            ],
        ))
        .unwrap();
        doc
    }

    #[test]
    fn test_pad_sides() {
        assert_eq!(Cell::Literal(Value::string("ab")).render(6), "\"ab  \"");
        assert_eq!(Cell::Literal(Value::Int(7)).render(4), "   7");
        assert_eq!(Cell::Literal(Value::Null).render(6), "  null");
        assert_eq!(Cell::Raw("oops".into()).render(6), "oops  ");
    }

    #[test]
    fn test_row_prefix_aligns_under_header() {
        let policy = AlignmentPolicy::default();
        assert_eq!(policy.row_prefix_spaces(4, 6), 9);
        assert_eq!(policy.row_prefix_spaces(0, 20), 1);
        assert_eq!(AlignmentPolicy::compact().row_prefix_spaces(4, 6), 1);
    }

    #[test]
    fn test_serialize_aligned_table() {
        let text = serialize(&sample(), &AlignmentPolicy::default());
        let expected = r#"{
  "DevVarTypes": {
    "columns": ["Variable_type", "Size"],
    "rows": [
      [         "tint8u       ",      1 ],
      [         "tfloat       ",   null ]
    ]
  }
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn test_serialize_empty_and_data_tables() {
        let mut doc = Document::new();
        doc.insert(Table::new("Empty", vec!["a".into()])).unwrap();
        doc.insert(Table {
            name: "Legacy".into(),
            columns: vec!["key".into(), "value".into()],
            body: TableBody::Data(vec![
                ("mode".into(), Value::Int(2)),
                ("label".into(), Value::string("x")),
            ]),
        })
        .unwrap();

        let text = serialize(&doc, &AlignmentPolicy::default());
        let expected = r#"{
  "Empty": {
    "columns": ["a"],
    "rows": []
  },
  "Legacy": {
    "columns": ["key", "value"],
    "data": {
      "mode": 2,
      "label": "x"
    }
  }
}
"#;
        assert_eq!(text, expected);
    }
}
