//! Schema transform pipeline
//!
//! Turns a raw database export (numeric foreign keys, internal id columns,
//! arbitrary row order) into the dump layout the generator reads: references
//! resolved to names, columns renamed and reordered, aliases generated,
//! internal columns dropped, rows sorted and renumbered.

pub mod alias;
pub mod columns;
pub mod foreign_key;
pub mod order;
pub mod pipeline;

pub use alias::{make_alias, ALIAS_LEN};
pub use columns::{drop_columns, move_column, rename_column};
pub use foreign_key::{substitute_foreign_key, ForeignKeyMap, LookupKind, Lookups, Substitution};
pub use order::{renumber, sort_rows, SortKey};
pub use pipeline::{Pipeline, Reshape, SortRule, Substitute, TableRule};

use rand::Rng;
use tabular_text::Document;
use tracing::info;

use crate::error::TransformError;

/// Read a plain JSON export and run the standard pipeline over it
pub fn import_export<R: Rng + ?Sized>(json: &str, rng: &mut R) -> Result<Document, TransformError> {
    let mut doc = Document::from_json_str(json)?;
    let lookups = Lookups::from_document(&doc);
    Pipeline::standard(lookups).apply(&mut doc, rng)?;
    info!(tables = doc.len(), "export transformed");
    Ok(doc)
}
