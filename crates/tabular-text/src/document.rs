//! Ordered set of named tables
//!
//! Table order is significant: it is the order tables are written back and
//! the order the generator walks them.

use crate::error::CodecError;
use crate::table::{Row, Table, TableBody};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    tables: Vec<Table>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table, enforcing unique table and column names
    pub fn insert(&mut self, table: Table) -> Result<(), CodecError> {
        if self.get(&table.name).is_some() {
            return Err(CodecError::DuplicateTable(table.name));
        }
        if let Some(column) = table.duplicate_column() {
            return Err(CodecError::DuplicateColumn {
                table: table.name.clone(),
                column: column.to_string(),
            });
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    // ========================================================================
    // Plain JSON exports
    // ========================================================================

    /// Build a document from a plain JSON export
    /// (`{"<table>": {"columns": [...], "rows": [[...]]}}`).
    ///
    /// Object key order of the export is kept.
    pub fn from_json_str(text: &str) -> Result<Self, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, CodecError> {
        let object = value.as_object().ok_or_else(|| CodecError::InvalidExport {
            table: String::new(),
            message: "top level is not an object".to_string(),
        })?;

        let mut doc = Document::new();
        for (name, body) in object {
            doc.insert(table_from_json(name, body)?)?;
        }
        Ok(doc)
    }
}

fn table_from_json(name: &str, body: &serde_json::Value) -> Result<Table, CodecError> {
    let invalid = |message: &str| CodecError::InvalidExport {
        table: name.to_string(),
        message: message.to_string(),
    };

    let columns = body
        .get("columns")
        .and_then(|c| c.as_array())
        .ok_or_else(|| invalid("missing \"columns\" array"))?
        .iter()
        .map(|c| c.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("column names must be strings"))?;

    if let Some(data) = body.get("data") {
        let entries = data
            .as_object()
            .ok_or_else(|| invalid("\"data\" is not an object"))?
            .iter()
            .map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid("\"data\" values must be scalars"))?;
        return Ok(Table {
            name: name.to_string(),
            columns,
            body: TableBody::Data(entries),
        });
    }

    let rows: Vec<Row> = match body.get("rows") {
        None => Vec::new(),
        Some(rows) => rows
            .as_array()
            .ok_or_else(|| invalid("\"rows\" is not an array"))?
            .iter()
            .map(|row| {
                row.as_array()
                    .and_then(|cells| cells.iter().map(Value::from_json).collect())
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid("rows must be arrays of scalars"))?,
    };

    Ok(Table::with_rows(name, columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_table_rejected() {
        let mut doc = Document::new();
        doc.insert(Table::new("A", vec!["x".into()])).unwrap();
        let err = doc.insert(Table::new("A", vec!["y".into()])).unwrap_err();
        assert!(matches!(err, CodecError::DuplicateTable(name) if name == "A"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut doc = Document::new();
        let err = doc
            .insert(Table::new("A", vec!["x".into(), "x".into()]))
            .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_json_export_keeps_order() {
        let doc = Document::from_json_str(
            r#"{
                "Zeta": {"columns": ["a"], "rows": [[1], [2.5]]},
                "Alpha": {"columns": ["k"], "data": {"one": "x", "two": null}}
            }"#,
        )
        .unwrap();

        assert_eq!(doc.table_names(), vec!["Zeta", "Alpha"]);
        assert_eq!(
            doc.get("Zeta").unwrap().rows(),
            &[vec![Value::Int(1)], vec![Value::Float(2.5)]]
        );
        let data = doc.get("Alpha").unwrap().data().unwrap();
        assert_eq!(data[0], ("one".to_string(), Value::string("x")));
        assert_eq!(data[1].1, Value::Null);
    }

    #[test]
    fn test_json_export_rejects_nested_cells() {
        let err =
            Document::from_json_str(r#"{"T": {"columns": ["a"], "rows": [[[1]]]}}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidExport { .. }));
    }
}
