//! Line-oriented dump reader
//!
//! The dump is read one line at a time rather than as a JSON document: rows
//! carry alignment padding inside string quotes, older files contain `//`
//! comments, and a single damaged row must not lose the rest of the file.
//! Recoverable problems are collected as [`FormatIssue`]s and the offending
//! row or block is skipped.

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{CodecError, FormatIssue};
use crate::table::{Row, Table, TableBody};
use crate::tokenize::tokenize_row;
use crate::value::Value;

/// Result of reading a dump
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub document: Document,
    pub issues: Vec<FormatIssue>,
}

impl Parsed {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Read a dump into a [`Document`]
pub fn parse(text: &str) -> Result<Parsed, CodecError> {
    let mut reader = Reader::default();
    for (i, line) in text.lines().enumerate() {
        reader.line(i + 1, line)?;
    }
    reader.finish()
}

// ============================================================================
// Reader state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    Outside,
    Table,
    Rows,
    Data,
}

/// Table under construction
#[derive(Debug)]
struct OpenTable {
    name: String,
    opened_at: usize,
    columns: Vec<String>,
    /// Set when the columns line could not be read; the block is dropped
    broken: bool,
    rows: Vec<Row>,
    row_lines: Vec<usize>,
    data: Option<Vec<(String, Value)>>,
}

impl OpenTable {
    fn new(name: String, line: usize) -> Self {
        Self {
            name,
            opened_at: line,
            columns: Vec::new(),
            broken: false,
            rows: Vec::new(),
            row_lines: Vec::new(),
            data: None,
        }
    }
}

#[derive(Debug, Default)]
struct Reader {
    document: Document,
    issues: Vec<FormatIssue>,
    section: Section,
    table: Option<OpenTable>,
}

impl Reader {
    fn issue(&mut self, line: usize, message: String) {
        warn!(line, "{}", message);
        self.issues.push(FormatIssue::new(line, message));
    }

    fn line(&mut self, no: usize, line: &str) -> Result<(), CodecError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            return Ok(());
        }

        match self.section {
            Section::Outside => self.outside_line(no, trimmed),
            Section::Table => self.table_line(no, trimmed),
            Section::Rows => self.rows_line(no, line, trimmed),
            Section::Data => self.data_line(no, trimmed),
        }
    }

    fn outside_line(&mut self, no: usize, trimmed: &str) -> Result<(), CodecError> {
        if matches!(trimmed, "{" | "}") {
            return Ok(());
        }
        match leading_key(trimmed) {
            Some((name, "{")) => {
                debug!(table = %name, line = no, "table block");
                self.table = Some(OpenTable::new(name, no));
                self.section = Section::Table;
            }
            _ => self.issue(no, format!("unexpected line outside a table: {}", trimmed)),
        }
        Ok(())
    }

    fn table_line(&mut self, no: usize, trimmed: &str) -> Result<(), CodecError> {
        if matches!(trimmed, "}" | "},") {
            self.section = Section::Outside;
            return self.close_table();
        }

        let Some((key, rest)) = leading_key(trimmed) else {
            self.issue(no, format!("unexpected line in table: {}", trimmed));
            return Ok(());
        };
        let rest = strip_comma(rest);

        match (key.as_str(), rest) {
            ("columns", _) => self.columns_line(no, rest),
            ("rows", "[") => self.section = Section::Rows,
            ("rows", "[]") => {}
            ("data", "{") => {
                self.open_table().data.get_or_insert_with(Vec::new);
                self.section = Section::Data;
            }
            ("data", "{}") => {
                self.open_table().data.get_or_insert_with(Vec::new);
            }
            (_, "{") => {
                // Previous table was never closed
                self.issue(no, format!("table '{}' opened before the previous one closed", key));
                self.close_table()?;
                self.table = Some(OpenTable::new(key.clone(), no));
            }
            _ => self.issue(no, format!("unexpected key '{}' in table", key)),
        }
        Ok(())
    }

    fn columns_line(&mut self, no: usize, rest: &str) {
        match serde_json::from_str::<Vec<String>>(rest) {
            Ok(columns) => self.open_table().columns = columns,
            Err(e) => {
                let name = self.open_table().name.clone();
                self.open_table().broken = true;
                self.issue(no, format!("table '{}': unreadable columns array: {}", name, e));
            }
        }
    }

    fn rows_line(&mut self, no: usize, line: &str, trimmed: &str) -> Result<(), CodecError> {
        if !trimmed.starts_with('[') {
            self.section = Section::Table;
            if matches!(trimmed, "]" | "],") {
                return Ok(());
            }
            return self.table_line(no, trimmed);
        }

        let Some(row_line) = tokenize_row(line) else {
            self.issue(no, format!("unterminated row: {}", trimmed));
            return Ok(());
        };

        let mut row = Vec::with_capacity(row_line.tokens.len());
        for token in &row_line.tokens {
            match Value::parse_literal(token) {
                Ok(value) => row.push(value),
                Err(e) => {
                    self.issue(no, format!("row skipped: {}", e));
                    return Ok(());
                }
            }
        }

        let table = self.open_table();
        table.rows.push(row);
        table.row_lines.push(no);
        Ok(())
    }

    fn data_line(&mut self, no: usize, trimmed: &str) -> Result<(), CodecError> {
        if matches!(trimmed, "}" | "},") {
            self.section = Section::Table;
            return Ok(());
        }

        let entry = leading_key(trimmed)
            .map(|(key, rest)| (key, Value::parse_literal(strip_comma(rest))));
        match entry {
            Some((key, Ok(value))) => {
                self.open_table().data.get_or_insert_with(Vec::new).push((key, value));
            }
            Some((key, Err(e))) => self.issue(no, format!("data entry '{}' skipped: {}", key, e)),
            None => self.issue(no, format!("unexpected line in data block: {}", trimmed)),
        }
        Ok(())
    }

    fn open_table(&mut self) -> &mut OpenTable {
        self.table.get_or_insert_with(|| OpenTable::new(String::new(), 0))
    }

    fn close_table(&mut self) -> Result<(), CodecError> {
        let Some(open) = self.table.take() else {
            return Ok(());
        };
        if open.broken {
            return Ok(());
        }

        let width = open.columns.len();
        for (k, (row, line)) in open.rows.iter().zip(&open.row_lines).enumerate() {
            if row.len() != width {
                self.issue(
                    *line,
                    format!(
                        "table '{}' row {} has {} values, expected {}",
                        open.name,
                        k + 1,
                        row.len(),
                        width
                    ),
                );
            }
        }

        let body = match open.data {
            Some(entries) => TableBody::Data(entries),
            None => TableBody::Rows(open.rows),
        };
        debug!(table = %open.name, columns = width, "table read");
        self.document.insert(Table {
            name: open.name,
            columns: open.columns,
            body,
        })
    }

    fn finish(mut self) -> Result<Parsed, CodecError> {
        if let Some(open) = &self.table {
            let (name, line) = (open.name.clone(), open.opened_at);
            self.issue(line, format!("table '{}' is not closed", name));
            self.close_table()?;
        }
        Ok(Parsed {
            document: self.document,
            issues: self.issues,
        })
    }
}

// ============================================================================
// Line helpers
// ============================================================================

/// Split `"key": rest` into the decoded key and the trimmed rest
fn leading_key(line: &str) -> Option<(String, &str)> {
    if !line.starts_with('"') {
        return None;
    }
    let mut stream = serde_json::Deserializer::from_str(line).into_iter::<String>();
    let key = stream.next()?.ok()?;
    let rest = line[stream.byte_offset()..].trim_start().strip_prefix(':')?;
    Some((key, rest.trim()))
}

fn strip_comma(s: &str) -> &str {
    s.strip_suffix(',').map_or(s, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DUMP: &str = r#"{
  "DevVarTypes": {
    "columns": ["Variable_type", "C_type" ],
    "rows": [
      [         "tint8u        ", "uint8_t" ],
      [         "tfloat        ", "float  " ]
    ]
  },
  // exporter note
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

    #[test]
    fn test_reads_all_table_shapes() {
        let parsed = parse(DUMP).unwrap();
        assert!(parsed.is_clean(), "{:?}", parsed.issues);
        let doc = parsed.document;
        assert_eq!(doc.table_names(), vec!["DevVarTypes", "Empty", "Legacy"]);

        let types = doc.get("DevVarTypes").unwrap();
        assert_eq!(types.columns, vec!["Variable_type", "C_type"]);
        assert_eq!(
            types.rows()[1],
            vec![Value::string("tfloat"), Value::string("float")]
        );
        assert!(doc.get("Empty").unwrap().rows().is_empty());
        assert_eq!(
            doc.get("Legacy").unwrap().data().unwrap()[0],
            ("mode".to_string(), Value::Int(2))
        );
    }

    #[test]
    fn test_bad_cell_skips_row_only() {
        let text = r#"{
  "T": {
    "columns": ["a", "b"],
    "rows": [
      [ 1, oops ],
      [ 2, 3 ]
    ]
  }
}"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].line, 5);
        assert_eq!(
            parsed.document.get("T").unwrap().rows(),
            &[vec![Value::Int(2), Value::Int(3)]]
        );
    }

    #[test]
    fn test_short_row_kept_and_reported() {
        let text = r#"{
  "T": {
    "columns": ["a", "b"],
    "rows": [
      [ 1 ]
    ]
  }
}"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.document.get("T").unwrap().rows().len(), 1);
        assert_eq!(parsed.issues.len(), 1);
        assert!(parsed.issues[0].message.contains("row 1 has 1 values, expected 2"));
    }

    #[test]
    fn test_unreadable_columns_drops_block() {
        let text = r#"{
  "Bad": {
    "columns": ["a", b],
    "rows": [
      [ 1, 2 ]
    ]
  },
  "Good": {
    "columns": ["x"],
    "rows": []
  }
}"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.document.table_names(), vec!["Good"]);
        assert_eq!(parsed.issues[0].line, 3);
    }

    #[test]
    fn test_duplicate_table_is_fatal() {
        let text = r#"{
  "A": {
    "columns": ["x"],
    "rows": []
  },
  "A": {
    "columns": ["x"],
    "rows": []
  }
}"#;
        assert!(matches!(parse(text), Err(CodecError::DuplicateTable(_))));
    }

    #[test]
    fn test_leading_key() {
        assert_eq!(
            leading_key(r#""a \"b\"": {"#),
            Some(("a \"b\"".to_string(), "{"))
        );
        assert_eq!(leading_key("[1, 2]"), None);
    }
}
