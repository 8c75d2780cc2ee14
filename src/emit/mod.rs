//! C source emitter
//!
//! Renders a validated [`DeviceProfile`] into the firmware header and source
//! pair. Output is a pure function of the profile: everything is walked in
//! table order, so identical input gives byte-identical files.

mod header;
mod source;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tabular_text::Value;
use tracing::info;

use crate::checksum::ChecksumIndex;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::GenerateError;
use crate::profile::{is_plain_number, DeviceProfile};

pub const BANNER: &str = "// This file is auto-generated. Do not edit manually.";

/// Knobs of the generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Project header included first by the source file
    pub include: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            include: "App.h".to_string(),
        }
    }
}

/// Rendered header/source pair with their file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub header_name: String,
    pub header: String,
    pub source_name: String,
    pub source: String,
}

/// Render both files for `profile` using a prebuilt checksum index
pub fn render(profile: &DeviceProfile, index: &ChecksumIndex, options: &EmitOptions) -> Artifacts {
    Artifacts {
        header_name: profile.header_file_name(),
        header: header::render(profile),
        source_name: profile.source_file_name(),
        source: source::render(profile, index, options),
    }
}

/// Build the checksum index, refuse colliding or reserved checksums, render
pub fn generate(profile: &DeviceProfile, options: &EmitOptions) -> Result<Artifacts, GenerateError> {
    let (index, report) = ChecksumIndex::build(&profile.variable_names());
    if !report.is_clean() {
        let mut diagnostics: Vec<Diagnostic> = report
            .collisions
            .iter()
            .map(|c| Diagnostic::error(DiagnosticCode::ChecksumCollision, c.to_string()))
            .collect();
        diagnostics.extend(report.reserved.iter().map(|(pos, name)| {
            Diagnostic::error(
                DiagnosticCode::ReservedChecksum,
                format!("'{}' hashes to 0xFFFF", name),
            )
            .at_row("DevParams", pos + 1)
        }));
        diagnostics.extend(report.overflow.iter().map(|(pos, name)| {
            Diagnostic::error(
                DiagnosticCode::IndexOverflow,
                format!("'{}' is past the last position a 16-bit index can address", name),
            )
            .at_row("DevParams", pos + 1)
        }));
        return Err(GenerateError::Validation(diagnostics));
    }

    let artifacts = render(profile, &index, options);
    info!(
        header = %artifacts.header_name,
        source = %artifacts.source_name,
        parameters = profile.parameters.len(),
        "artifacts rendered"
    );
    Ok(artifacts)
}

// ============================================================================
// Text helpers
// ============================================================================

static UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").expect("valid upper-case pattern"));
static NOT_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid caption pattern"));

/// `OnOffMode` → `ON_OFF_MODE`
pub fn upper_snake(name: &str) -> String {
    let snake = UPPER.replace_all(name, "_$0").to_lowercase();
    snake.trim_start_matches('_').to_uppercase()
}

/// Caption as a macro-name fragment: non-alphanumerics become `_`
pub fn sanitize_caption(caption: &str) -> String {
    NOT_ALNUM.replace_all(caption, "_").to_uppercase()
}

/// Escape for the inside of a C string literal
pub(crate) fn c_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn c_string(s: &str) -> String {
    format!("\"{}\"", c_escape(s))
}

/// Numeric initializer; text that is not a plain number becomes a string
pub(crate) fn c_number(value: &Value) -> String {
    match value {
        Value::Null => "0".to_string(),
        Value::Bool(b) => u8::from(*b).to_string(),
        Value::Int(_) | Value::Float(_) => value.literal(),
        Value::String(s) if is_plain_number(s) => s.trim().to_string(),
        Value::String(s) => c_string(s),
    }
}

/// Callback initializer: a function name as is, otherwise a number
pub(crate) fn c_callback(value: &Value) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() && !is_plain_number(s) => {
            s.trim().to_string()
        }
        other => c_number(other),
    }
}

/// Sections separated by one blank line; the file ends with a newline
pub(crate) fn join_sections(sections: Vec<Vec<String>>) -> String {
    let mut out = sections
        .into_iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}
