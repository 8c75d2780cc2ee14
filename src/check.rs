//! Format/type consistency checks
//!
//! Every parameter carries a printf-style display format. The firmware
//! prints the value with it, so the conversion has to suit the storage
//! type. This module parses the format, judges it against the variable
//! type, and checks the variable-name checksums the firmware searches by.

use std::collections::BTreeMap;
use std::fmt;

use nom::{
    bytes::complete::take_while,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt},
    sequence::{preceded, tuple},
    IResult,
};
use tabular_text::{Document, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::checksum::{checksum16, ChecksumIndex, CollisionReport};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::GenerateError;
use crate::profile::VarType;

/// Conversions the firmware printf understands
pub const CONVERSIONS: &str = "diouxXfFeEgGaAscp";

const FLAGS: &str = "+-# 0";

/// Largest precision accepted on a floating conversion
pub const MAX_FLOAT_PRECISION: u32 = 20;

// ============================================================================
// Format specifier
// ============================================================================

/// `%[flags][width][.precision][length]conversion`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: String,
    pub width: Option<u32>,
    pub precision: Option<u32>,
    /// Any run of `l` and `h`
    pub length: String,
    pub conversion: char,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("format '{0}' must start with '%'")]
    MissingPercent(String),

    #[error("invalid format specifier syntax: '{0}'")]
    Syntax(String),
}

impl FormatSpec {
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        if !input.starts_with('%') {
            return Err(FormatError::MissingPercent(input.to_string()));
        }
        all_consuming(format_spec)(input)
            .map(|(_, spec)| spec)
            .map_err(|_| FormatError::Syntax(input.to_string()))
    }

    pub fn is_float(&self) -> bool {
        "fFeEgGaA".contains(self.conversion)
    }

    pub fn is_integer(&self) -> bool {
        "diouxX".contains(self.conversion)
    }
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>)(input)
}

type Parts<'a> = (char, &'a str, Option<u32>, Option<u32>, &'a str, char);

fn format_spec(input: &str) -> IResult<&str, FormatSpec> {
    map(
        tuple((
            char('%'),
            take_while(|c: char| FLAGS.contains(c)),
            opt(number),
            opt(preceded(char('.'), number)),
            take_while(|c: char| c == 'l' || c == 'h'),
            one_of(CONVERSIONS),
        )),
        |(_, flags, width, precision, length, conversion): Parts<'_>| FormatSpec {
            flags: flags.to_string(),
            width,
            precision,
            length: length.to_string(),
            conversion,
        },
    )(input)
}

// ============================================================================
// Verdicts
// ============================================================================

/// Result of judging one format against one variable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    Ok,
    /// Usable but probably not what was meant
    Warning(String),
    Error(String),
}

impl FormatVerdict {
    pub fn is_error(&self) -> bool {
        matches!(self, FormatVerdict::Error(_))
    }
}

/// Judge `format` against the variable type named `var_type`.
///
/// Suspicious pairings (`%s` on an unsigned integer, a numeric conversion on
/// a string, an integer conversion on a float) are warnings even when the
/// conversion is not otherwise allowed for the type.
pub fn check_format(format: &str, var_type: &str) -> FormatVerdict {
    let Some(var_type) = VarType::from_name(var_type) else {
        return FormatVerdict::Error(format!("unknown variable type '{}'", var_type));
    };
    let spec = match FormatSpec::parse(format) {
        Ok(spec) => spec,
        Err(e) => return FormatVerdict::Error(e.to_string()),
    };

    if let Some(precision) = spec.precision {
        if spec.is_float() && precision > MAX_FLOAT_PRECISION {
            return FormatVerdict::Error(format!(
                "precision too high ({}) in '{}'",
                precision, format
            ));
        }
        if spec.is_integer() {
            return FormatVerdict::Error(format!(
                "precision not applicable for integer format '{}'",
                format
            ));
        }
    }

    if var_type.is_unsigned_int() && format == "%s" {
        return FormatVerdict::Warning(format!(
            "string format '%s' for numeric type '{}'",
            var_type
        ));
    }
    if var_type == VarType::String && spec.is_integer() {
        return FormatVerdict::Warning(format!(
            "numeric format '{}' for string type '{}'",
            format, var_type
        ));
    }
    if var_type == VarType::Float && spec.is_integer() {
        return FormatVerdict::Warning(format!(
            "integer format '{}' for float type '{}'",
            format, var_type
        ));
    }

    if !var_type.allowed_conversions().contains(&spec.conversion) {
        let allowed: String = var_type.allowed_conversions().iter().collect();
        return FormatVerdict::Error(format!(
            "conversion '{}{}' in '{}' is not allowed for '{}' (allowed: {})",
            spec.length, spec.conversion, format, var_type, allowed
        ));
    }
    FormatVerdict::Ok
}

// ============================================================================
// Whole-profile report
// ============================================================================

/// One parameter in the checksum listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumLine {
    pub checksum: u16,
    pub name: String,
    /// `CATEGORY.SubNumber`
    pub slot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub total_params: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub type_distribution: BTreeMap<String, usize>,
    pub format_distribution: BTreeMap<String, usize>,
    /// Ascending by checksum
    pub checksums: Vec<ChecksumLine>,
    pub collisions: CollisionReport,
}

impl CheckReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn is_consistent(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

fn cell_text(value: Option<&Value>) -> String {
    value.map(Value::display_text).unwrap_or_default()
}

/// Run the format check on every parameter and the checksum checks on all
/// variable names of the `DevParams` table
pub fn check_profile(doc: &Document) -> Result<CheckReport, GenerateError> {
    let table = doc
        .get("DevParams")
        .ok_or_else(|| GenerateError::MissingTable("DevParams".to_string()))?;
    let index = table.column_index();
    index.require_all(&[
        "Variable_type",
        "format",
        "Variable_name",
        "Category",
        "SubNumber",
    ])?;

    let mut report = CheckReport {
        total_params: table.rows().len(),
        ..CheckReport::default()
    };
    let mut names = Vec::new();
    let mut slots = Vec::new();

    for (number, row) in table.numbered_rows() {
        let record = index.record(row);
        if !record.is_complete() {
            report.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::RowShape,
                    format!("{} values, expected {}; row skipped", record.len(), index.width()),
                )
                .at_row(&table.name, number),
            );
            continue;
        }
        let var_type = cell_text(record.get("Variable_type"));
        let format = cell_text(record.get("format"));
        let name = cell_text(record.get("Variable_name"));
        let slot = format!(
            "{}.{}",
            cell_text(record.get("Category")),
            cell_text(record.get("SubNumber"))
        );

        *report.type_distribution.entry(var_type.clone()).or_default() += 1;
        *report.format_distribution.entry(format.clone()).or_default() += 1;

        let about = format!("parameter '{}' ({})", name, slot);
        match check_format(&format, &var_type) {
            FormatVerdict::Ok => {}
            FormatVerdict::Warning(msg) => report.diagnostics.push(
                Diagnostic::warning(DiagnosticCode::FormatMismatch, format!("{}: {}", about, msg))
                    .at_row(&table.name, number),
            ),
            FormatVerdict::Error(msg) => report.diagnostics.push(
                Diagnostic::error(DiagnosticCode::InvalidFormat, format!("{}: {}", about, msg))
                    .at_row(&table.name, number),
            ),
        }

        names.push(name);
        slots.push(slot);
    }

    let (checksums, collisions) = ChecksumIndex::build(&names);
    report.checksums = checksums
        .entries()
        .iter()
        .map(|e| {
            let pos = usize::from(e.index);
            ChecksumLine {
                checksum: e.checksum,
                name: names[pos].clone(),
                slot: slots[pos].clone(),
            }
        })
        .collect();
    for collision in &collisions.collisions {
        report.diagnostics.push(Diagnostic::error(
            DiagnosticCode::ChecksumCollision,
            collision.to_string(),
        ));
    }
    for (_, name) in &collisions.reserved {
        report.diagnostics.push(Diagnostic::error(
            DiagnosticCode::ReservedChecksum,
            format!(
                "'{}' hashes to 0x{:04X}, which the firmware reserves for 'not found'",
                name,
                checksum16(name)
            ),
        ));
    }
    for (pos, name) in &collisions.overflow {
        report.diagnostics.push(Diagnostic::error(
            DiagnosticCode::IndexOverflow,
            format!(
                "'{}' (#{}) is past the last position a 16-bit index can address",
                name, pos
            ),
        ));
    }
    report.collisions = collisions;

    for d in report.warnings() {
        warn!("{}", d);
    }
    for d in report.errors() {
        debug!("{}", d);
    }
    info!(
        params = report.total_params,
        errors = report.errors().count(),
        warnings = report.warnings().count(),
        "consistency check finished"
    );
    Ok(report)
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(40);
        let errors: Vec<&Diagnostic> = self.errors().collect();
        let warnings: Vec<&Diagnostic> = self.warnings().collect();

        writeln!(f, "Parameters checked: {}", self.total_params)?;
        writeln!(f, "Format errors:      {}", errors.len())?;
        writeln!(f, "Warnings:           {}", warnings.len())?;
        writeln!(f, "Checksum collisions: {}", self.collisions.collisions.len())?;
        writeln!(f)?;

        writeln!(f, "Variable types:")?;
        writeln!(f, "{}", rule)?;
        for (var_type, count) in &self.type_distribution {
            writeln!(f, "  {:<15}: {:>3}", var_type, count)?;
        }
        writeln!(f)?;

        writeln!(f, "Formats:")?;
        writeln!(f, "{}", rule)?;
        for (format, count) in &self.format_distribution {
            writeln!(f, "  {:<15}: {:>3}", format, count)?;
        }
        writeln!(f)?;

        writeln!(f, "Name checksums:")?;
        writeln!(f, "{}", "-".repeat(80))?;
        for group in self.checksums.chunk_by(|a, b| a.checksum == b.checksum) {
            if let [line] = group {
                writeln!(f, "  0x{:04X}: {:<25} ({})", line.checksum, line.name, line.slot)?;
            } else {
                writeln!(f, "  0x{:04X}: *** COLLISION ***", group[0].checksum)?;
                for line in group {
                    writeln!(f, "          {:<25} ({})", line.name, line.slot)?;
                }
            }
        }

        for (title, list) in [("Errors:", &errors), ("Warnings:", &warnings)] {
            if list.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{}", title)?;
            writeln!(f, "{}", rule)?;
            for (i, d) in list.iter().enumerate() {
                writeln!(f, "{:>3}. {}", i + 1, d)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabular_text::Table;

    #[test]
    fn test_parse_full_specifier() {
        let spec = FormatSpec::parse("%-08.3lf").unwrap();
        assert_eq!(spec.flags, "-0");
        assert_eq!(spec.width, Some(8));
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.length, "l");
        assert_eq!(spec.conversion, 'f');
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(FormatSpec::parse("d"), Err(FormatError::MissingPercent(_))));
        assert!(matches!(FormatSpec::parse("%q"), Err(FormatError::Syntax(_))));
        assert!(matches!(FormatSpec::parse("%d units"), Err(FormatError::Syntax(_))));
    }

    #[test]
    fn test_string_format_on_integer_warns() {
        assert!(matches!(check_format("%s", "tint16u"), FormatVerdict::Warning(_)));
    }

    #[test]
    fn test_unknown_conversion_is_error() {
        assert!(check_format("%q", "tint16u").is_error());
    }

    #[test]
    fn test_type_rules() {
        assert_eq!(check_format("%ld", "tint32u"), FormatVerdict::Ok);
        assert_eq!(check_format("%.2f", "tfloat"), FormatVerdict::Ok);
        assert!(matches!(check_format("%d", "tfloat"), FormatVerdict::Warning(_)));
        assert!(matches!(check_format("%u", "tstring"), FormatVerdict::Warning(_)));
        assert!(check_format("%.21f", "tfloat").is_error());
        assert!(check_format("%.2d", "tint16u").is_error());
        assert!(check_format("%f", "tint8u").is_error());
        assert!(check_format("%d", "tbogus").is_error());
    }

    fn params(rows: Vec<Vec<Value>>) -> Document {
        let mut doc = Document::new();
        doc.insert(Table::with_rows(
            "DevParams",
            vec![
                "Category".into(),
                "SubNumber".into(),
                "Variable_name".into(),
                "Variable_type".into(),
                "format".into(),
            ],
            rows,
        ))
        .unwrap();
        doc
    }

    #[test]
    fn test_profile_report() {
        let doc = params(vec![
            vec!["CAT_A".into(), Value::Int(1), "MotorSpeed".into(), "tint16u".into(), "%d".into()],
            vec!["CAT_A".into(), Value::Int(2), "Mode".into(), "tint8u".into(), "%s".into()],
            vec!["CAT_A".into(), Value::Int(3), "Gain".into(), "tfloat".into(), "%q".into()],
        ]);
        let report = check_profile(&doc).unwrap();

        assert_eq!(report.total_params, 3);
        assert_eq!(report.type_distribution.get("tint16u"), Some(&1));
        assert_eq!(report.format_distribution.len(), 3);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.errors().count(), 1);
        assert!(!report.is_consistent());

        let error = report.errors().next().unwrap();
        assert_eq!(error.location.as_ref().unwrap().row, 3);
        assert!(error.message.starts_with("parameter 'Gain' (CAT_A.3)"));

        assert_eq!(report.checksums.len(), 3);
        assert!(report.checksums.windows(2).all(|w| w[0].checksum <= w[1].checksum));
        assert!(report.to_string().contains("Warnings:"));
    }

    #[test]
    fn test_short_row_warns_like_profile() {
        let doc = params(vec![
            vec!["CAT_A".into(), Value::Int(1), "MotorSpeed".into(), "tint16u".into(), "%d".into()],
            vec!["CAT_A".into(), Value::Int(2), "Mode".into()],
        ]);
        let report = check_profile(&doc).unwrap();

        assert!(report.is_consistent());
        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.code, DiagnosticCode::RowShape);
        assert_eq!(
            warning.to_string(),
            "DevParams row 2: 3 values, expected 5; row skipped"
        );
        assert_eq!(report.checksums.len(), 1);
    }

    #[test]
    fn test_duplicate_names_collide() {
        let doc = params(vec![
            vec!["CAT_A".into(), Value::Int(1), "Speed".into(), "tint16u".into(), "%d".into()],
            vec!["CAT_B".into(), Value::Int(1), "Speed".into(), "tint16u".into(), "%d".into()],
        ]);
        let report = check_profile(&doc).unwrap();
        assert_eq!(report.collisions.collisions.len(), 1);
        assert_eq!(report.errors().next().unwrap().code, DiagnosticCode::ChecksumCollision);
        assert!(report.to_string().contains("*** COLLISION ***"));
    }
}
