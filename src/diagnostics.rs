//! Diagnostics Module
//!
//! Single finding type shared by profile validation and the consistency
//! checks. A diagnostic names the table and 1-based row it is about, when
//! there is one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic codes for categorizing findings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Row shape
    // =========================================================================
    RowShape,
    MissingValue,

    // =========================================================================
    // References
    // =========================================================================
    UnknownCategory,
    UnknownParent,
    UnknownVarType,
    UnknownSelector,

    // =========================================================================
    // Uniqueness
    // =========================================================================
    DuplicateSubNumber,
    DuplicateVariable,
    DuplicateCategory,
    ChecksumCollision,
    ReservedChecksum,
    IndexOverflow,

    // =========================================================================
    // Values
    // =========================================================================
    InvalidLength,
    InvalidNumber,
    InvalidFormat,
    FormatMismatch,
    EmptySelector,
    EmptyTable,
}

/// Table row a diagnostic refers to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub table: String,
    /// 1-based row number within the table
    pub row: usize,
}

/// A finding with severity and optional row location
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Option<RowRef>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach the table row this finding is about
    pub fn at_row(mut self, table: &str, row: usize) -> Self {
        self.location = Some(RowRef {
            table: table.to_string(),
            row,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(at) => write!(f, "{} row {}: {}", at.table, at.row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Count errors in a diagnostic list
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_row() {
        let d = Diagnostic::error(DiagnosticCode::RowShape, "3 values, expected 5")
            .at_row("DevParams", 4);
        assert_eq!(d.to_string(), "DevParams row 4: 3 values, expected 5");
        assert!(d.is_error());
        assert_eq!(error_count(&[d.clone(), Diagnostic::warning(d.code, "w")]), 1);
    }
}
