//! Device profile model
//!
//! The validated, typed view of a dump that the emitter consumes. Building
//! it resolves every column by name, checks every cross-table reference and
//! collects all findings before deciding whether generation may proceed.
//!
//! Policy for malformed rows: a row whose length differs from its header is
//! skipped with a warning. That only stops the run when something later
//! refers to what the skipped row would have declared.

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tabular_text::{ColumnIndex, Document, Record, Table, Value};
use tracing::{debug, info, warn};

use crate::diagnostics::{error_count, Diagnostic, DiagnosticCode};
use crate::error::GenerateError;

// ============================================================================
// Variable types
// ============================================================================

/// Storage type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarType {
    #[serde(rename = "tint8u")]
    Int8u,
    #[serde(rename = "tint16u")]
    Int16u,
    #[serde(rename = "tint32u")]
    Int32u,
    #[serde(rename = "tint32s")]
    Int32s,
    #[serde(rename = "tfloat")]
    Float,
    #[serde(rename = "tstring")]
    String,
    #[serde(rename = "tarrofbyte")]
    ArrOfByte,
    #[serde(rename = "tarrofdouble")]
    ArrOfDouble,
}

impl VarType {
    pub const ALL: [VarType; 8] = [
        VarType::Int8u,
        VarType::Int16u,
        VarType::Int32u,
        VarType::Int32s,
        VarType::Float,
        VarType::String,
        VarType::ArrOfByte,
        VarType::ArrOfDouble,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name.trim())
    }

    /// Name as written in the dump and in the firmware enum
    pub fn name(self) -> &'static str {
        match self {
            VarType::Int8u => "tint8u",
            VarType::Int16u => "tint16u",
            VarType::Int32u => "tint32u",
            VarType::Int32s => "tint32s",
            VarType::Float => "tfloat",
            VarType::String => "tstring",
            VarType::ArrOfByte => "tarrofbyte",
            VarType::ArrOfDouble => "tarrofdouble",
        }
    }

    /// Built-in C type; `DevVarTypes.C_type` overrides it
    pub fn c_type(self) -> &'static str {
        match self {
            VarType::Int8u | VarType::String | VarType::ArrOfByte => "uint8_t",
            VarType::Int16u => "uint16_t",
            VarType::Int32u => "uint32_t",
            VarType::Int32s => "int32_t",
            VarType::Float | VarType::ArrOfDouble => "float",
        }
    }

    /// printf conversions a display format may use for this type
    pub fn allowed_conversions(self) -> &'static [char] {
        match self {
            VarType::Int8u | VarType::Int16u | VarType::Int32u => &['d', 'u', 'x', 'X', 'o', 'i'],
            VarType::Int32s => &['d', 'i'],
            VarType::Float | VarType::ArrOfDouble => &['f', 'F', 'e', 'E', 'g', 'G', 'a', 'A'],
            VarType::String => &['s'],
            VarType::ArrOfByte => &['s', 'd', 'x', 'X'],
        }
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(self, VarType::Int8u | VarType::Int16u | VarType::Int32u)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Profile
// ============================================================================

pub const DEFAULT_PROFILE: &str = "MC80";
pub const DEFAULT_STRUCT: &str = "wvar";

/// Names used when the dump has no `DevProfiles` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    pub profile_name: String,
    pub struct_name: String,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            profile_name: DEFAULT_PROFILE.to_string(),
            struct_name: DEFAULT_STRUCT.to_string(),
        }
    }
}

/// Node of the menu tree
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    /// `None` for a root
    pub parent: Option<String>,
    pub description: String,
    pub comment: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub category: String,
    pub sub_number: i64,
    pub selector: Option<String>,
    pub description: String,
    pub alias: String,
    pub variable_name: String,
    pub var_type: VarType,
    pub c_type: String,
    pub default_value: Value,
    pub min_value: Value,
    pub max_value: Value,
    pub attributes: Value,
    pub default_string: String,
    pub format: String,
    pub callback: Value,
    /// Array length; 0 declares a scalar field
    pub length: u32,
    pub menu_pos: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorItem {
    pub value: i64,
    pub caption: String,
    pub image_index: i64,
}

/// A named list of value/caption choices
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub name: String,
    pub description: String,
    pub items: Vec<SelectorItem>,
}

/// Everything the emitter needs for one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub profile_name: String,
    pub struct_name: String,
    /// Tree order; a category's ordinal is its position here
    pub categories: Vec<Category>,
    /// Metadata array order
    pub parameters: Vec<Parameter>,
    /// Declaration order of `Selectors`
    pub selectors: Vec<Selector>,
    /// Selector names in order of first appearance in `SelectorsLists`
    pub list_order: Vec<String>,
}

impl DeviceProfile {
    pub fn from_document(doc: &Document) -> Result<(Self, Vec<Diagnostic>), GenerateError> {
        Self::from_document_with(doc, &ProfileDefaults::default())
    }

    /// Build and validate; any error diagnostic fails with
    /// [`GenerateError::Validation`] carrying every finding
    pub fn from_document_with(
        doc: &Document,
        defaults: &ProfileDefaults,
    ) -> Result<(Self, Vec<Diagnostic>), GenerateError> {
        let mut builder = Builder::default();

        let (profile_name, struct_name) = builder.profile_names(doc, defaults)?;
        let categories = builder.categories(require_table(doc, "DevParamTree")?)?;
        let c_types = builder.c_types(doc)?;
        let mut selectors = builder.selectors(doc)?;
        let list_order = builder.selector_items(doc, &mut selectors)?;
        let parameters = builder.parameters(
            require_table(doc, "DevParams")?,
            &categories,
            &selectors,
            &c_types,
        )?;

        let profile = Self {
            profile_name,
            struct_name,
            categories,
            parameters,
            selectors,
            list_order,
        };
        builder.check_used_selectors(&profile);

        let diagnostics = builder.diagnostics;
        if error_count(&diagnostics) > 0 {
            return Err(GenerateError::Validation(diagnostics));
        }
        for d in &diagnostics {
            warn!("{}", d);
        }
        info!(
            profile = %profile.profile_name,
            categories = profile.categories.len(),
            parameters = profile.parameters.len(),
            selectors = profile.selectors.len(),
            "profile loaded"
        );
        Ok((profile, diagnostics))
    }

    /// Selectors referenced by at least one parameter, in declaration order
    pub fn used_selectors(&self) -> Vec<&Selector> {
        let used = self.used_selector_names();
        self.selectors
            .iter()
            .filter(|s| used.contains(s.name.as_str()))
            .collect()
    }

    /// Used selectors in the order their items first appear
    pub fn constant_groups(&self) -> Vec<&Selector> {
        let used = self.used_selector_names();
        self.list_order
            .iter()
            .filter(|name| used.contains(name.as_str()))
            .filter_map(|name| self.selector(name))
            .collect()
    }

    /// Position of a selector in `selectors_list`; 0 when there is none
    pub fn selector_id(&self, name: Option<&str>) -> usize {
        name.and_then(|n| self.used_selectors().iter().position(|s| s.name == n))
            .unwrap_or(0)
    }

    pub fn selector(&self, name: &str) -> Option<&Selector> {
        self.selectors.iter().find(|s| s.name == name)
    }

    /// Non-root categories, which make up the menu table
    pub fn menu_entries(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.parent.is_some())
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .map(|p| p.variable_name.as_str())
            .collect()
    }

    pub fn type_name(&self) -> String {
        format!("{}_TYPE", self.struct_name.to_uppercase())
    }

    pub fn size_macro(&self) -> String {
        format!("{}_SIZE", self.struct_name.to_uppercase())
    }

    pub fn array_name(&self) -> String {
        format!("arr_{}", self.struct_name)
    }

    pub fn instance_name(&self) -> String {
        format!("{}_inst", self.struct_name)
    }

    pub fn header_guard(&self) -> String {
        format!("{}_PARAMS_H", self.profile_name.to_uppercase())
    }

    pub fn header_file_name(&self) -> String {
        format!("{}_Params.h", self.profile_name)
    }

    pub fn source_file_name(&self) -> String {
        format!("{}_Params.c", self.profile_name)
    }

    fn used_selector_names(&self) -> HashSet<&str> {
        self.parameters
            .iter()
            .filter_map(|p| p.selector.as_deref())
            .collect()
    }
}

fn require_table<'a>(doc: &'a Document, name: &str) -> Result<&'a Table, GenerateError> {
    doc.get(name)
        .ok_or_else(|| GenerateError::MissingTable(name.to_string()))
}

/// Non-null cell as trimmed text; "" when absent
fn text(record: &Record<'_>, column: &str) -> String {
    record
        .value(column)
        .map(|v| v.display_text().trim().to_string())
        .unwrap_or_default()
}

fn optional_text(record: &Record<'_>, column: &str) -> Option<String> {
    Some(text(record, column)).filter(|s| !s.is_empty())
}

static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d+(\.\d+)?$").expect("valid number pattern"));

/// Decimal literal C accepts as is, e.g. `-12` or `0.25`
pub fn is_plain_number(text: &str) -> bool {
    PLAIN_NUMBER.is_match(text.trim())
}

/// Columns that become numeric initializers in the metadata array
const NUMERIC_COLUMNS: [&str; 4] = ["DefaultValue", "MinValue", "MaxValue", "Attributes"];

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
struct Builder {
    diagnostics: Vec<Diagnostic>,
}

impl Builder {
    fn error(&mut self, code: DiagnosticCode, table: &str, row: usize, message: String) {
        self.diagnostics
            .push(Diagnostic::error(code, message).at_row(table, row));
    }

    /// Complete rows with their 1-based numbers; short rows are reported and skipped
    fn complete_rows<'a>(
        &mut self,
        table: &'a Table,
        index: &'a ColumnIndex,
    ) -> Vec<(usize, Record<'a>)> {
        let mut rows = Vec::with_capacity(table.rows().len());
        for (number, row) in table.numbered_rows() {
            let record = index.record(row);
            if record.is_complete() {
                rows.push((number, record));
            } else {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::RowShape,
                        format!(
                            "{} values, expected {}; row skipped",
                            record.len(),
                            index.width()
                        ),
                    )
                    .at_row(&table.name, number),
                );
            }
        }
        rows
    }

    fn profile_names(
        &mut self,
        doc: &Document,
        defaults: &ProfileDefaults,
    ) -> Result<(String, String), GenerateError> {
        let fallback = || (defaults.profile_name.clone(), defaults.struct_name.clone());
        let Some(table) = doc.get("DevProfiles") else {
            debug!("no DevProfiles table, using defaults");
            return Ok(fallback());
        };
        let index = table.column_index();
        index.require("ProfileName")?;

        let rows = self.complete_rows(table, &index);
        let Some((_, record)) = rows.first() else {
            return Ok(fallback());
        };
        let profile = optional_text(record, "ProfileName").unwrap_or(defaults.profile_name.clone());
        let structure = optional_text(record, "StructName").unwrap_or(defaults.struct_name.clone());
        Ok((profile, structure))
    }

    fn categories(&mut self, table: &Table) -> Result<Vec<Category>, GenerateError> {
        let index = table.column_index();
        index.require_all(&["Category", "Parent"])?;

        let mut categories: Vec<Category> = Vec::new();
        let mut seen = HashSet::new();
        let mut numbers = Vec::new();
        for (number, record) in self.complete_rows(table, &index) {
            let name = text(&record, "Category");
            if name.is_empty() {
                self.error(
                    DiagnosticCode::MissingValue,
                    &table.name,
                    number,
                    "empty category name".to_string(),
                );
                continue;
            }
            if !seen.insert(name.clone()) {
                self.error(
                    DiagnosticCode::DuplicateCategory,
                    &table.name,
                    number,
                    format!("category '{}' is declared twice", name),
                );
                continue;
            }
            categories.push(Category {
                name,
                parent: optional_text(&record, "Parent"),
                description: text(&record, "Description"),
                comment: text(&record, "Comment"),
                visible: record
                    .value("Visible")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            });
            numbers.push(number);
        }

        for (category, number) in categories.iter().zip(numbers) {
            if let Some(parent) = &category.parent {
                if !seen.contains(parent) {
                    self.error(
                        DiagnosticCode::UnknownParent,
                        &table.name,
                        number,
                        format!("category '{}' has unknown parent '{}'", category.name, parent),
                    );
                }
            }
        }
        Ok(categories)
    }

    fn c_types(&mut self, doc: &Document) -> Result<HashMap<String, String>, GenerateError> {
        let Some(table) = doc.get("DevVarTypes") else {
            return Ok(HashMap::new());
        };
        let index = table.column_index();
        index.require_all(&["Variable_type", "C_type"])?;

        let mut c_types = HashMap::new();
        for (_, record) in self.complete_rows(table, &index) {
            let name = text(&record, "Variable_type");
            let c_type = text(&record, "C_type");
            if !name.is_empty() && !c_type.is_empty() {
                c_types.insert(name, c_type);
            }
        }
        Ok(c_types)
    }

    fn selectors(&mut self, doc: &Document) -> Result<Vec<Selector>, GenerateError> {
        let Some(table) = doc.get("Selectors") else {
            return Ok(Vec::new());
        };
        let index = table.column_index();
        index.require("Selector_name")?;

        let mut selectors: Vec<Selector> = Vec::new();
        for (_, record) in self.complete_rows(table, &index) {
            let Some(name) = optional_text(&record, "Selector_name") else {
                continue;
            };
            if selectors.iter().any(|s| s.name == name) {
                debug!(selector = %name, "duplicate selector declaration ignored");
                continue;
            }
            selectors.push(Selector {
                name,
                description: text(&record, "Selector_description"),
                items: Vec::new(),
            });
        }
        Ok(selectors)
    }

    /// Attach items to their selectors and return the first-appearance order
    fn selector_items(
        &mut self,
        doc: &Document,
        selectors: &mut [Selector],
    ) -> Result<Vec<String>, GenerateError> {
        let Some(table) = doc.get("SelectorsLists") else {
            return Ok(Vec::new());
        };
        let index = table.column_index();
        index.require_all(&["Selector_name", "ValueStr", "Caption"])?;

        let mut order: Vec<String> = Vec::new();
        for (number, record) in self.complete_rows(table, &index) {
            let Some(name) = optional_text(&record, "Selector_name") else {
                continue;
            };
            let Some(value) = record.value("ValueStr").and_then(Value::as_i64) else {
                self.error(
                    DiagnosticCode::MissingValue,
                    &table.name,
                    number,
                    format!("selector '{}' item value is not an integer", name),
                );
                continue;
            };
            if !order.contains(&name) {
                order.push(name.clone());
            }
            let item = SelectorItem {
                value,
                caption: text(&record, "Caption"),
                image_index: record.i64("ImageIndex").unwrap_or(-1),
            };
            match selectors.iter_mut().find(|s| s.name == name) {
                Some(selector) => selector.items.push(item),
                None => debug!(selector = %name, "items for undeclared selector"),
            }
        }
        Ok(order)
    }

    fn parameters(
        &mut self,
        table: &Table,
        categories: &[Category],
        selectors: &[Selector],
        c_types: &HashMap<String, String>,
    ) -> Result<Vec<Parameter>, GenerateError> {
        let index = table.column_index();
        index.require_all(&[
            "Category",
            "SubNumber",
            "Variable_name",
            "Variable_type",
            "format",
        ])?;

        let known_categories: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut slots: HashSet<(String, i64)> = HashSet::new();
        let mut names: HashSet<String> = HashSet::new();
        let mut parameters = Vec::new();

        for (number, record) in self.complete_rows(table, &index) {
            let name = &table.name;
            let variable_name = text(&record, "Variable_name");
            if variable_name.is_empty() {
                self.error(
                    DiagnosticCode::MissingValue,
                    name,
                    number,
                    "empty Variable_name".to_string(),
                );
                continue;
            }

            let category = text(&record, "Category");
            if !known_categories.contains(category.as_str()) {
                self.error(
                    DiagnosticCode::UnknownCategory,
                    name,
                    number,
                    format!("'{}' refers to unknown category '{}'", variable_name, category),
                );
            }

            let type_name = text(&record, "Variable_type");
            let Some(var_type) = VarType::from_name(&type_name) else {
                self.error(
                    DiagnosticCode::UnknownVarType,
                    name,
                    number,
                    format!("'{}' has unknown variable type '{}'", variable_name, type_name),
                );
                continue;
            };

            let selector = optional_text(&record, "Selector_name");
            if let Some(selector) = &selector {
                if !selectors.iter().any(|s| &s.name == selector) {
                    self.error(
                        DiagnosticCode::UnknownSelector,
                        name,
                        number,
                        format!("'{}' uses undeclared selector '{}'", variable_name, selector),
                    );
                }
            }

            let length = match record.value("Variable_length") {
                None => 0,
                Some(v) => match v.as_i64().and_then(|n| u32::try_from(n).ok()) {
                    Some(n) => n,
                    None => {
                        self.error(
                            DiagnosticCode::InvalidLength,
                            name,
                            number,
                            format!("'{}' has invalid Variable_length {}", variable_name, v),
                        );
                        continue;
                    }
                },
            };

            let Some(sub_number) = record.value("SubNumber").and_then(Value::as_i64) else {
                self.error(
                    DiagnosticCode::MissingValue,
                    name,
                    number,
                    format!("'{}' has no integer SubNumber", variable_name),
                );
                continue;
            };

            if !slots.insert((category.clone(), sub_number)) {
                self.error(
                    DiagnosticCode::DuplicateSubNumber,
                    name,
                    number,
                    format!("{}.{} is used twice", category, sub_number),
                );
            }
            if !names.insert(variable_name.clone()) {
                self.error(
                    DiagnosticCode::DuplicateVariable,
                    name,
                    number,
                    format!("variable '{}' is declared twice", variable_name),
                );
            }

            let mut numbers = Vec::with_capacity(NUMERIC_COLUMNS.len());
            for column in NUMERIC_COLUMNS {
                match record.value(column) {
                    None => numbers.push(Value::Int(0)),
                    Some(v @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))) => {
                        numbers.push(v.clone())
                    }
                    Some(Value::String(text)) if is_plain_number(text) => {
                        numbers.push(Value::string(text.trim()))
                    }
                    Some(other) => self.error(
                        DiagnosticCode::InvalidNumber,
                        name,
                        number,
                        format!("'{}' has non-numeric {} {}", variable_name, column, other),
                    ),
                }
            }
            let [default_value, min_value, max_value, attributes]: [Value; 4] =
                match numbers.try_into() {
                    Ok(values) => values,
                    Err(_) => continue,
                };

            let c_type = c_types
                .get(var_type.name())
                .cloned()
                .unwrap_or_else(|| var_type.c_type().to_string());

            parameters.push(Parameter {
                sub_number,
                menu_pos: record.value("MenuPos").and_then(Value::as_i64).unwrap_or(sub_number),
                selector,
                description: text(&record, "ParameterDescription"),
                alias: text(&record, "ParameterAlias"),
                var_type,
                c_type,
                default_value,
                min_value,
                max_value,
                attributes,
                default_string: text(&record, "DefaultString"),
                format: text(&record, "format"),
                callback: record.value("Callback").cloned().unwrap_or(Value::Int(0)),
                length,
                category,
                variable_name,
            });
        }

        if parameters.is_empty() && error_count(&self.diagnostics) == 0 {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::EmptyTable,
                format!("{} declares no parameters; nothing to generate", table.name),
            ));
        }
        Ok(parameters)
    }

    fn check_used_selectors(&mut self, profile: &DeviceProfile) {
        for selector in profile.used_selectors() {
            if selector.items.is_empty() {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::EmptySelector,
                    format!("selector '{}' has no items", selector.name),
                ));
            }
        }
    }
}
