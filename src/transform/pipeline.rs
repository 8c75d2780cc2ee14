//! Per-table transform rules
//!
//! Each rule runs its phases in a fixed order:
//!
//! 1. foreign-key substitution
//! 2. reshape (trim, rename, move, integer coercion), in listed order
//! 3. alias generation
//! 4. column drop
//! 5. sort and renumber
//!
//! Tables without a rule pass through untouched.

use rand::Rng;
use tabular_text::{Document, Table};
use tracing::{debug, info, warn};

use super::alias::assign_aliases;
use super::columns::{coerce_int_column, drop_columns, move_column, rename_column, trim_column};
use super::foreign_key::{substitute_foreign_key, LookupKind, Lookups};
use super::order::{renumber, sort_rows, SortKey};
use crate::error::TransformError;

/// Foreign-key step of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitute {
    pub column: String,
    pub lookup: LookupKind,
    /// Column holding the row's own key; a reference to it becomes `null`
    pub self_key: Option<String>,
    /// Remove rows whose reference did not resolve
    pub drop_unresolved: bool,
    /// Fail when the column is absent instead of skipping
    pub required: bool,
}

impl Substitute {
    pub fn new(column: &str, lookup: LookupKind) -> Self {
        Self {
            column: column.to_string(),
            lookup,
            self_key: None,
            drop_unresolved: false,
            required: false,
        }
    }

    pub fn self_key(mut self, column: &str) -> Self {
        self.self_key = Some(column.to_string());
        self
    }

    pub fn drop_unresolved(mut self) -> Self {
        self.drop_unresolved = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Reshape step of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reshape {
    Trim(String),
    Rename { from: String, to: String },
    Move { column: String, position: usize },
    CoerceInt(String),
}

impl Reshape {
    pub fn rename(from: &str, to: &str) -> Self {
        Reshape::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn move_to(column: &str, position: usize) -> Self {
        Reshape::Move {
            column: column.to_string(),
            position,
        }
    }
}

/// Sort keys plus an optional `(group, counter)` renumbering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRule {
    pub keys: Vec<SortKey>,
    pub renumber: Option<(String, String)>,
}

/// Everything done to one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRule {
    pub table: String,
    pub substitutions: Vec<Substitute>,
    pub reshape: Vec<Reshape>,
    /// `(source, target)` columns for alias generation
    pub alias: Option<(String, String)>,
    pub drop: Vec<String>,
    pub sort: Option<SortRule>,
}

impl TableRule {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn substitute(mut self, step: Substitute) -> Self {
        self.substitutions.push(step);
        self
    }

    pub fn reshape(mut self, step: Reshape) -> Self {
        self.reshape.push(step);
        self
    }

    pub fn alias(mut self, source: &str, target: &str) -> Self {
        self.alias = Some((source.to_string(), target.to_string()));
        self
    }

    pub fn drop_columns(mut self, columns: &[&str]) -> Self {
        self.drop.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn sort(mut self, keys: Vec<SortKey>, renumber: Option<(&str, &str)>) -> Self {
        self.sort = Some(SortRule {
            keys,
            renumber: renumber.map(|(g, c)| (g.to_string(), c.to_string())),
        });
        self
    }

    /// Run all phases on `table`
    pub fn apply<R: Rng + ?Sized>(
        &self,
        table: &mut Table,
        lookups: &Lookups,
        rng: &mut R,
    ) -> Result<(), TransformError> {
        for step in &self.substitutions {
            if !table.has_column(&step.column) && !step.required {
                debug!(table = %table.name, column = %step.column, "substitution skipped");
                continue;
            }
            let outcome = substitute_foreign_key(
                table,
                &step.column,
                lookups.get(step.lookup),
                step.self_key.as_deref(),
            )?;
            if step.drop_unresolved && !outcome.unresolved.is_empty() {
                warn!(
                    table = %table.name,
                    column = %step.column,
                    rows = outcome.unresolved.len(),
                    "dropping rows with unresolved references"
                );
                if let Some(rows) = table.rows_mut() {
                    let mut pos = 0;
                    rows.retain(|_| {
                        let keep = !outcome.unresolved.contains(&pos);
                        pos += 1;
                        keep
                    });
                }
            }
        }

        for step in &self.reshape {
            let applied = match step {
                Reshape::Trim(column) => trim_column(table, column),
                Reshape::Rename { from, to } => rename_column(table, from, to),
                Reshape::Move { column, position } => move_column(table, column, *position),
                Reshape::CoerceInt(column) => coerce_int_column(table, column),
            };
            if !applied {
                debug!(table = %table.name, ?step, "reshape step skipped");
            }
        }

        if let Some((source, target)) = &self.alias {
            assign_aliases(table, source, target, rng)?;
        }

        drop_columns(table, &self.drop);

        if let Some(sort) = &self.sort {
            sort_rows(table, &sort.keys)?;
            if let Some((group, counter)) = &sort.renumber {
                renumber(table, group, counter)?;
            }
        }
        Ok(())
    }
}

/// Ordered set of table rules plus the lookups they read
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    lookups: Lookups,
    rules: Vec<TableRule>,
}

impl Pipeline {
    pub fn new(lookups: Lookups) -> Self {
        Self {
            lookups,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: TableRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules of the parameter database exporter
    pub fn standard(lookups: Lookups) -> Self {
        use LookupKind::*;

        Self::new(lookups)
            .with_rule(
                TableRule::new("DevParams")
                    .substitute(Substitute::new("sublevel", CategoryById).required())
                    .substitute(Substitute::new("SelectorID", SelectorByNumber))
                    .substitute(Substitute::new("ParameterType", VarTypeById))
                    .reshape(Reshape::rename("sublevel", "Category"))
                    .reshape(Reshape::rename("SelectorID", "Selector_name"))
                    .reshape(Reshape::rename("ParameterType", "Variable_type"))
                    .reshape(Reshape::rename("Parameter_variable_name", "Variable_name"))
                    .reshape(Reshape::move_to("Category", 0))
                    .reshape(Reshape::move_to("SubNumber", 1))
                    .reshape(Reshape::move_to("Selector_name", 2))
                    .alias("ParameterName", "ParameterAlias")
                    .drop_columns(&["ID", "ProfileID", "PrevID", "ParameterName"])
                    .sort(
                        vec![
                            SortKey::TextNoCase("Category".into()),
                            SortKey::Number("SubNumber".into()),
                        ],
                        Some(("Category", "SubNumber")),
                    ),
            )
            .with_rule(
                TableRule::new("DevParamTree")
                    .substitute(
                        Substitute::new("Parent", CategoryById)
                            .self_key("ID")
                            .required(),
                    )
                    .reshape(Reshape::Trim("CategoryName".into()))
                    .reshape(Reshape::rename("CategoryName", "Category"))
                    .reshape(Reshape::move_to("Category", 0))
                    .drop_columns(&[
                        "ID",
                        "ProfileID",
                        "PrevID",
                        "PrevParentID",
                        "ShortDescription",
                        // exported with trailing blanks in its name
                        "Comment           ",
                    ])
                    .sort(
                        vec![
                            SortKey::Text("Parent".into()),
                            SortKey::Text("Category".into()),
                        ],
                        None,
                    ),
            )
            .with_rule(
                TableRule::new("Selectors")
                    .reshape(Reshape::rename("SelectorName", "Selector_name"))
                    .reshape(Reshape::rename("SlectorDescription", "Selector_description"))
                    .drop_columns(&["ID", "ProfileID", "Number"]),
            )
            .with_rule(
                TableRule::new("SelectorsLists")
                    .substitute(Substitute::new("SelectorID", SelectorById).drop_unresolved())
                    .reshape(Reshape::rename("SelectorID", "Selector_name"))
                    .reshape(Reshape::CoerceInt("ValueStr".into()))
                    .drop_columns(&["ID", "ProfileID"])
                    .sort(
                        vec![
                            SortKey::Text("Selector_name".into()),
                            SortKey::Number("ValueStr".into()),
                        ],
                        None,
                    ),
            )
            .with_rule(
                TableRule::new("DevVarTypes")
                    .reshape(Reshape::Trim("VarTypeName".into()))
                    .reshape(Reshape::rename("VarTypeName", "Variable_type"))
                    .drop_columns(&["ID", "ProfileID"]),
            )
            .with_rule(TableRule::new("DevProfiles").drop_columns(&["ID", "ProfileID"]))
    }

    /// Apply every rule to its table; tables without a rule are untouched
    pub fn apply<R: Rng + ?Sized>(&self, doc: &mut Document, rng: &mut R) -> Result<(), TransformError> {
        for table in doc.tables_mut() {
            let Some(rule) = self.rules.iter().find(|r| r.table == table.name) else {
                debug!(table = %table.name, "no transform rule");
                continue;
            };
            rule.apply(table, &self.lookups, rng)?;
            info!(
                table = %table.name,
                columns = table.columns.len(),
                rows = table.rows().len(),
                "table transformed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tabular_text::Value;

    fn export() -> Document {
        Document::from_json_str(
            r#"{
                "DevProfiles": {
                    "columns": ["ID", "ProfileID", "ProfileName"],
                    "rows": [[1, 1, "MC80"]]
                },
                "DevParamTree": {
                    "columns": ["ID", "ProfileID", "PrevID", "CategoryName", "Parent", "Description"],
                    "rows": [
                        [2, 1, 0, "CAT_SPEED ", 1, "Speed"],
                        [1, 1, 0, "CAT_ROOT", 1, "Root"]
                    ]
                },
                "DevVarTypes": {
                    "columns": ["ID", "ProfileID", "VarTypeName"],
                    "rows": [[3, 1, " tint16u "]]
                },
                "Selectors": {
                    "columns": ["ID", "ProfileID", "Number", "SelectorName", "SlectorDescription"],
                    "rows": [[7, 1, 40, "OnOff", "Switch"]]
                },
                "SelectorsLists": {
                    "columns": ["ID", "ProfileID", "SelectorID", "ValueStr", "Caption"],
                    "rows": [
                        [1, 1, 7, "1", "On"],
                        [2, 1, 99, "5", "Orphan"],
                        [3, 1, 7, "0", "Off"]
                    ]
                },
                "DevParams": {
                    "columns": ["ID", "ProfileID", "PrevID", "ParameterName", "sublevel", "SubNumber",
                                "Parameter_variable_name", "ParameterType", "SelectorID", "format"],
                    "rows": [
                        [11, 1, 0, "Max speed", 2, 9, "MaxSpeed", 3, 40, "%d"],
                        [10, 1, 0, "Motor speed", 2, 4, "MotorSpeed", 3, null, "%d"]
                    ]
                },
                "Unrelated": {"columns": ["x"], "rows": [[1]]}
            }"#,
        )
        .unwrap()
    }

    fn run(doc: &mut Document) {
        let lookups = Lookups::from_document(doc);
        Pipeline::standard(lookups)
            .apply(doc, &mut StdRng::seed_from_u64(1))
            .unwrap();
    }

    #[test]
    fn test_params_are_resolved_and_renumbered() {
        let mut doc = export();
        run(&mut doc);

        let params = doc.get("DevParams").unwrap();
        assert_eq!(
            params.columns,
            vec![
                "Category",
                "SubNumber",
                "Selector_name",
                "Variable_name",
                "Variable_type",
                "format",
                "ParameterAlias"
            ]
        );
        let rows = params.rows();
        assert_eq!(rows[0][3], Value::string("MotorSpeed"));
        assert_eq!(rows[0][0], Value::string("CAT_SPEED"));
        assert_eq!(rows[0][1], Value::Int(1));
        assert_eq!(rows[0][2], Value::Null);
        assert_eq!(rows[0][4], Value::string("tint16u"));
        assert_eq!(rows[1][1], Value::Int(2));
        assert_eq!(rows[1][2], Value::string("OnOff"));
    }

    #[test]
    fn test_tree_roots_and_order() {
        let mut doc = export();
        run(&mut doc);

        let tree = doc.get("DevParamTree").unwrap();
        assert_eq!(tree.columns, vec!["Category", "Parent", "Description"]);
        assert_eq!(tree.rows()[0][0], Value::string("CAT_ROOT"));
        assert_eq!(tree.rows()[0][1], Value::Null);
        assert_eq!(tree.rows()[1][0], Value::string("CAT_SPEED"));
        assert_eq!(tree.rows()[1][1], Value::string("CAT_ROOT"));
    }

    #[test]
    fn test_selector_items_filtered_and_sorted() {
        let mut doc = export();
        run(&mut doc);

        let items = doc.get("SelectorsLists").unwrap();
        assert_eq!(items.columns, vec!["Selector_name", "ValueStr", "Caption"]);
        assert_eq!(
            items.rows(),
            &[
                vec!["OnOff".into(), Value::Int(0), "Off".into()],
                vec!["OnOff".into(), Value::Int(1), "On".into()],
            ]
        );

        let selectors = doc.get("Selectors").unwrap();
        assert_eq!(selectors.columns, vec!["Selector_name", "Selector_description"]);
    }

    #[test]
    fn test_other_tables_untouched() {
        let mut doc = export();
        let before = doc.get("Unrelated").unwrap().clone();
        run(&mut doc);
        assert_eq!(doc.get("Unrelated").unwrap(), &before);
        assert_eq!(doc.get("DevProfiles").unwrap().columns, vec!["ProfileName"]);
        assert_eq!(doc.get("DevVarTypes").unwrap().columns, vec!["Variable_type"]);
    }

    #[test]
    fn test_required_substitution_reports_column() {
        let mut doc = Document::new();
        doc.insert(Table::new("DevParams", vec!["ParameterName".into()]))
            .unwrap();
        let err = Pipeline::standard(Lookups::default())
            .apply(&mut doc, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(
            matches!(err, TransformError::MissingColumn { ref column, .. } if column == "sublevel")
        );
    }
}
