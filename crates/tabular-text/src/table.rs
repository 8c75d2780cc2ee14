//! Tables and named-column row access
//!
//! Consumers never index rows by hard-coded position. They resolve the
//! column names they need once per table through [`ColumnIndex`] and read
//! cells through a [`Record`] view, so reordering columns in the dump cannot
//! silently shift fields.

use std::collections::HashMap;

use thiserror::Error;

use crate::value::Value;

pub type Row = Vec<Value>;

/// Body of a table: rows, or the legacy flat key/value map
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    Rows(Vec<Row>),
    /// `{columns, data}` shape; kept only for the one legacy table that uses it
    Data(Vec<(String, Value)>),
}

/// A named table with ordered columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub body: TableBody,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            body: TableBody::Rows(Vec::new()),
        }
    }

    pub fn with_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            columns,
            body: TableBody::Rows(rows),
        }
    }

    /// Rows of the table; empty for a `data` table
    pub fn rows(&self) -> &[Row] {
        match &self.body {
            TableBody::Rows(rows) => rows,
            TableBody::Data(_) => &[],
        }
    }

    /// Mutable rows; `None` for a `data` table
    pub fn rows_mut(&mut self) -> Option<&mut Vec<Row>> {
        match &mut self.body {
            TableBody::Rows(rows) => Some(rows),
            TableBody::Data(_) => None,
        }
    }

    pub fn data(&self) -> Option<&[(String, Value)]> {
        match &self.body {
            TableBody::Data(entries) => Some(entries),
            TableBody::Rows(_) => None,
        }
    }

    pub fn is_data_table(&self) -> bool {
        matches!(self.body, TableBody::Data(_))
    }

    pub fn push_row(&mut self, row: Row) {
        if let Some(rows) = self.rows_mut() {
            rows.push(row);
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// First duplicated column name, if any
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.columns
            .iter()
            .find(|c| !seen.insert(c.as_str()))
            .map(|c| c.as_str())
    }

    /// Resolve the column-name map once for this table
    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.name, &self.columns)
    }

    /// Iterate rows together with their 1-based row number
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &Row)> {
        self.rows().iter().enumerate().map(|(i, r)| (i + 1, r))
    }

    /// 1-based numbers and lengths of rows whose length differs from the header
    pub fn shape_mismatches(&self) -> Vec<(usize, usize)> {
        let width = self.columns.len();
        self.numbered_rows()
            .filter(|(_, row)| row.len() != width)
            .map(|(n, row)| (n, row.len()))
            .collect()
    }
}

// ============================================================================
// Named access
// ============================================================================

/// A required column is absent from a table
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("table '{table}' has no column '{column}'")]
pub struct MissingColumn {
    pub table: String,
    pub column: String,
}

/// Column name → position map, resolved once per table
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    table: String,
    positions: HashMap<String, usize>,
    width: usize,
}

impl ColumnIndex {
    pub fn new(table: &str, columns: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            positions.entry(name.clone()).or_insert(i);
        }
        Self {
            table: table.to_string(),
            positions,
            width: columns.len(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Position of a column that must exist
    pub fn require(&self, column: &str) -> Result<usize, MissingColumn> {
        self.position(column).ok_or_else(|| MissingColumn {
            table: self.table.clone(),
            column: column.to_string(),
        })
    }

    /// Check several required columns; reports the first missing one
    pub fn require_all(&self, columns: &[&str]) -> Result<(), MissingColumn> {
        for column in columns {
            self.require(column)?;
        }
        Ok(())
    }

    pub fn record<'a>(&'a self, row: &'a [Value]) -> Record<'a> {
        Record { index: self, row }
    }
}

/// Read-only view of one row through its table's [`ColumnIndex`]
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    index: &'a ColumnIndex,
    row: &'a [Value],
}

impl<'a> Record<'a> {
    /// Cell by column name; `None` when the column is unknown or the row is short
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.index.position(column).and_then(|i| self.row.get(i))
    }

    /// Cell by column name with `Null` treated as absent
    pub fn value(&self, column: &str) -> Option<&'a Value> {
        self.get(column).filter(|v| !v.is_null())
    }

    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn is_complete(&self) -> bool {
        self.row.len() == self.index.width
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Table {
        Table::with_rows(
            "DevParams",
            vec!["Category".into(), "SubNumber".into(), "Variable_name".into()],
            vec![
                vec!["CAT_A".into(), Value::Int(1), "speed".into()],
                vec!["CAT_A".into(), Value::Int(2)],
            ],
        )
    }

    #[test]
    fn test_record_reads_by_name() {
        let table = params();
        let index = table.column_index();
        let rec = index.record(&table.rows()[0]);
        assert_eq!(rec.str("Variable_name"), Some("speed"));
        assert_eq!(rec.i64("SubNumber"), Some(1));
        assert_eq!(rec.get("Missing"), None);
        assert!(rec.is_complete());
    }

    #[test]
    fn test_short_row_yields_none() {
        let table = params();
        let index = table.column_index();
        let rec = index.record(&table.rows()[1]);
        assert_eq!(rec.get("Variable_name"), None);
        assert!(!rec.is_complete());
        assert_eq!(table.shape_mismatches(), vec![(2, 2)]);
    }

    #[test]
    fn test_require_names_missing_column() {
        let index = params().column_index();
        let err = index.require_all(&["Category", "format"]).unwrap_err();
        assert_eq!(err.table, "DevParams");
        assert_eq!(err.column, "format");
    }
}
