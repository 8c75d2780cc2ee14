//! Foreign-key substitution
//!
//! A reference column holding numeric ids is rewritten to the display name
//! of the referenced row. The maps are plain values handed to the pipeline;
//! nothing here reaches into other tables on its own.

use std::collections::HashMap;

use tabular_text::{Document, MissingColumn, Table, Value};
use tracing::debug;

/// Key → display string lookup built from one source table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyMap {
    name: String,
    entries: HashMap<String, String>,
}

impl ForeignKeyMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Build from `key_column → display_column` of `table`; display strings
    /// are trimmed
    pub fn from_table(
        name: impl Into<String>,
        table: &Table,
        key_column: &str,
        display_column: &str,
    ) -> Result<Self, MissingColumn> {
        let index = table.column_index();
        index.require_all(&[key_column, display_column])?;

        let mut map = Self::new(name);
        for row in table.rows() {
            let record = index.record(row);
            if let (Some(key), Some(display)) = (record.value(key_column), record.value(display_column))
            {
                map.insert(key, display.display_text().trim());
            }
        }
        Ok(map)
    }

    pub fn insert(&mut self, key: &Value, display: impl Into<String>) {
        self.entries.insert(key_text(key), display.into());
    }

    /// Exact key match
    pub fn get(&self, key: &Value) -> Option<&str> {
        if key.is_null() {
            return None;
        }
        self.entries.get(&key_text(key)).map(String::as_str)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key_text(key: &Value) -> String {
    key.display_text()
}

/// Which of the [`Lookups`] a substitution reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// `DevParamTree.ID → CategoryName`
    CategoryById,
    /// `Selectors.Number → SelectorName`
    SelectorByNumber,
    /// `Selectors.ID → SelectorName`
    SelectorById,
    /// `DevVarTypes.ID → VarTypeName`
    VarTypeById,
}

/// All id → name joins of the source database
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub category_by_id: ForeignKeyMap,
    pub selector_by_number: ForeignKeyMap,
    pub selector_by_id: ForeignKeyMap,
    pub var_type_by_id: ForeignKeyMap,
}

impl Lookups {
    /// Build every map from the raw export; an absent table or column gives
    /// an empty map, so its references pass through unchanged
    pub fn from_document(doc: &Document) -> Self {
        let build = |table: &str, key: &str, display: &str| {
            let name = format!("{}.{}", table, key);
            match doc.get(table) {
                Some(t) => ForeignKeyMap::from_table(&name, t, key, display).unwrap_or_else(|e| {
                    debug!(map = %name, "lookup left empty: {}", e);
                    ForeignKeyMap::new(&name)
                }),
                None => ForeignKeyMap::new(name),
            }
        };

        Self {
            category_by_id: build("DevParamTree", "ID", "CategoryName"),
            selector_by_number: build("Selectors", "Number", "SelectorName"),
            selector_by_id: build("Selectors", "ID", "SelectorName"),
            var_type_by_id: build("DevVarTypes", "ID", "VarTypeName"),
        }
    }

    pub fn get(&self, kind: LookupKind) -> &ForeignKeyMap {
        match kind {
            LookupKind::CategoryById => &self.category_by_id,
            LookupKind::SelectorByNumber => &self.selector_by_number,
            LookupKind::SelectorById => &self.selector_by_id,
            LookupKind::VarTypeById => &self.var_type_by_id,
        }
    }
}

/// Outcome of one substitution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub resolved: usize,
    /// 0-based positions of rows whose key had no match
    pub unresolved: Vec<usize>,
    /// Rows whose reference pointed at themselves and became roots
    pub roots: usize,
}

/// Replace the ids in `column` with display names from `map`.
///
/// Unmatched keys keep their raw value. With `self_key`, a reference equal
/// to the row's own key becomes `null`.
pub fn substitute_foreign_key(
    table: &mut Table,
    column: &str,
    map: &ForeignKeyMap,
    self_key: Option<&str>,
) -> Result<Substitution, MissingColumn> {
    let index = table.column_index();
    let target = index.require(column)?;
    let own = self_key.map(|k| index.require(k)).transpose()?;

    let mut outcome = Substitution::default();
    let Some(rows) = table.rows_mut() else {
        return Ok(outcome);
    };

    for (pos, row) in rows.iter_mut().enumerate() {
        let Some(reference) = row.get(target).cloned() else {
            outcome.unresolved.push(pos);
            continue;
        };

        if let Some(own) = own.and_then(|i| row.get(i)) {
            if !reference.is_null() && *own == reference {
                row[target] = Value::Null;
                outcome.roots += 1;
                continue;
            }
        }

        match map.get(&reference) {
            Some(display) => {
                row[target] = Value::string(display);
                outcome.resolved += 1;
            }
            None => outcome.unresolved.push(pos),
        }
    }

    debug!(
        table = %table.name,
        column,
        map = map.name(),
        resolved = outcome.resolved,
        unresolved = outcome.unresolved.len(),
        "foreign key substituted"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Table {
        Table::with_rows(
            "DevParamTree",
            vec!["ID".into(), "CategoryName".into(), "Parent".into()],
            vec![
                vec![Value::Int(1), "CAT_ROOT ".into(), Value::Int(1)],
                vec![Value::Int(2), "CAT_SPEED".into(), Value::Int(1)],
                vec![Value::Int(3), "CAT_ORPHAN".into(), Value::Int(99)],
            ],
        )
    }

    #[test]
    fn test_self_reference_becomes_root() {
        let mut table = tree();
        let map = ForeignKeyMap::from_table("cat", &table, "ID", "CategoryName").unwrap();
        let outcome = substitute_foreign_key(&mut table, "Parent", &map, Some("ID")).unwrap();

        assert_eq!(outcome.roots, 1);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.unresolved, vec![2]);
        assert_eq!(table.rows()[0][2], Value::Null);
        assert_eq!(table.rows()[1][2], Value::string("CAT_ROOT"));
        // unmatched keys pass through raw
        assert_eq!(table.rows()[2][2], Value::Int(99));
    }

    #[test]
    fn test_empty_table_is_noop() {
        let mut table = Table::new("T", vec!["ref".into()]);
        let outcome =
            substitute_foreign_key(&mut table, "ref", &ForeignKeyMap::new("m"), None).unwrap();
        assert_eq!(outcome, Substitution::default());
    }

    #[test]
    fn test_missing_column_named() {
        let mut table = tree();
        let err = substitute_foreign_key(&mut table, "sublevel", &ForeignKeyMap::new("m"), None)
            .unwrap_err();
        assert_eq!(err.column, "sublevel");
    }

    #[test]
    fn test_integral_float_key_matches_int() {
        let mut map = ForeignKeyMap::new("m");
        map.insert(&Value::Int(4), "tfloat");
        assert_eq!(map.get(&Value::Float(4.0)), Some("tfloat"));
        assert_eq!(map.get(&Value::Null), None);
    }
}
