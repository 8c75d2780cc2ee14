//! Error types for the generator layers
//!
//! Recoverable findings travel as [`Diagnostic`]s; these enums are what
//! stops a run.

use tabular_text::{CodecError, MissingColumn};
use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Errors raised while materializing a dump from a database export
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("could not derive a unique alias for '{name}'")]
    AliasExhausted { name: String },

    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<MissingColumn> for TransformError {
    fn from(e: MissingColumn) -> Self {
        TransformError::MissingColumn {
            table: e.table,
            column: e.column,
        }
    }
}

/// Errors that abort generation before any file is written
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("required table '{0}' is missing")]
    MissingTable(String),

    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{} validation error(s), first: {}", .0.len(), first_message(.0))]
    Validation(Vec<Diagnostic>),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<MissingColumn> for GenerateError {
    fn from(e: MissingColumn) -> Self {
        GenerateError::MissingColumn {
            table: e.table,
            column: e.column,
        }
    }
}

impl GenerateError {
    /// Diagnostics carried by a validation failure
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            GenerateError::Validation(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default()
}
