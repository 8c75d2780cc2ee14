//! Error types for the table codec
//!
//! Two tiers: `CodecError` aborts a read (the document would violate one of
//! its invariants), `FormatIssue` records a recoverable problem that the
//! reader skipped over.

use std::fmt;

use thiserror::Error;

/// Fatal codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    #[error("table '{table}': duplicate column '{column}'")]
    DuplicateColumn { table: String, column: String },

    #[error("invalid export for table '{table}': {message}")]
    InvalidExport { table: String, message: String },

    #[error("invalid JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single cell literal could not be read
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("empty literal")]
    Empty,

    #[error("invalid string literal {0}")]
    InvalidString(String),

    #[error("unrecognized literal '{0}'")]
    Unrecognized(String),
}

/// Non-fatal problem found while reading or re-aligning a dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatIssue {
    /// 1-based line number in the source text
    pub line: usize,
    pub message: String,
}

impl FormatIssue {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
