//! File-level workflows behind the CLI
//!
//! Each workflow reads its input completely, does all of its work in
//! memory, and only then touches the filesystem. Outputs are staged in
//! temporary files beside their targets and persisted together, so a failed
//! run leaves no half-written files. The input is copied to `<input>.backup`
//! before it is rewritten.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use tabular_text::{parse, realign, serialize, Document, FormatIssue};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::check::{check_profile, CheckReport};
use crate::config::GeneratorConfig;
use crate::diagnostics::Diagnostic;
use crate::emit;
use crate::error::GenerateError;
use crate::profile::DeviceProfile;
use crate::transform::import_export;

/// What a `generate` run produced
#[derive(Debug)]
pub struct GenerateOutcome {
    pub header_path: PathBuf,
    pub source_path: PathBuf,
    /// Whether the input was re-aligned and rewritten
    pub input_rewritten: bool,
    pub issues: Vec<FormatIssue>,
    /// Warnings from the checks and the profile model
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct AlignOutcome {
    pub changed: bool,
    pub blocks_aligned: usize,
    pub issues: Vec<FormatIssue>,
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub output: PathBuf,
    pub tables: usize,
}

// ============================================================================
// Workflows
// ============================================================================

/// Re-align, check and generate `<PROFILE>_Params.h/.c` next to `input`
pub fn generate(input: &Path, config: &GeneratorConfig) -> Result<GenerateOutcome> {
    let original = read_input(input)?;
    let realigned = realign(&original, &config.alignment);
    let mut issues = realigned.issues;

    let parsed = parse(&realigned.text)
        .with_context(|| format!("Failed to read tables from {}", input.display()))?;
    issues.extend(parsed.issues);
    log_issues(input, &issues);

    let report = check_profile(&parsed.document)?;
    let mut diagnostics = gate_report(&report, config.warnings_fatal)?;

    let (profile, profile_diagnostics) =
        DeviceProfile::from_document_with(&parsed.document, &config.profile)?;
    diagnostics.extend(profile_diagnostics);

    let artifacts = emit::generate(&profile, &config.emit)?;

    let dir = directory_of(input);
    let header_path = dir.join(&artifacts.header_name);
    let source_path = dir.join(&artifacts.source_name);

    let mut staged = vec![
        Staged::new(&header_path, &artifacts.header)?,
        Staged::new(&source_path, &artifacts.source)?,
    ];
    let input_rewritten = realigned.text != original;
    if input_rewritten {
        staged.push(Staged::new(input, &realigned.text)?);
        backup(input)?;
    }
    commit(staged)?;

    info!(
        header = %header_path.display(),
        source = %source_path.display(),
        "Generated parameter sources"
    );
    Ok(GenerateOutcome {
        header_path,
        source_path,
        input_rewritten,
        issues,
        diagnostics,
    })
}

/// Re-align `input` in place
pub fn align(input: &Path, config: &GeneratorConfig) -> Result<AlignOutcome> {
    let original = read_input(input)?;
    let realigned = realign(&original, &config.alignment);
    log_issues(input, &realigned.issues);

    let changed = realigned.text != original;
    if changed {
        let staged = Staged::new(input, &realigned.text)?;
        backup(input)?;
        commit(vec![staged])?;
        info!(blocks = realigned.blocks_aligned, "Re-aligned {}", input.display());
    } else {
        info!("{} is already aligned", input.display());
    }
    Ok(AlignOutcome {
        changed,
        blocks_aligned: realigned.blocks_aligned,
        issues: realigned.issues,
    })
}

/// Run the consistency checks without writing anything
pub fn check(input: &Path) -> Result<CheckReport> {
    let text = read_input(input)?;
    let parsed =
        parse(&text).with_context(|| format!("Failed to read tables from {}", input.display()))?;
    log_issues(input, &parsed.issues);
    Ok(check_profile(&parsed.document)?)
}

/// Transform a plain JSON export into an aligned dump at `output`
pub fn import<R: Rng + ?Sized>(
    export: &Path,
    output: &Path,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<ImportOutcome> {
    let json = read_input(export)?;
    let doc: Document = import_export(&json, rng)
        .with_context(|| format!("Failed to transform {}", export.display()))?;
    let text = serialize(&doc, &config.alignment);

    let staged = Staged::new(output, &text)?;
    if output.is_file() {
        backup(output)?;
    }
    commit(vec![staged])?;

    info!(tables = doc.len(), "Wrote {}", output.display());
    Ok(ImportOutcome {
        output: output.to_path_buf(),
        tables: doc.len(),
    })
}

/// Errors always stop generation; warnings do when configured to
fn gate_report(report: &CheckReport, warnings_fatal: bool) -> Result<Vec<Diagnostic>, GenerateError> {
    let blocking: Vec<Diagnostic> = report
        .diagnostics
        .iter()
        .filter(|d| d.is_error() || (warnings_fatal && d.is_warning()))
        .cloned()
        .collect();
    if !blocking.is_empty() {
        return Err(GenerateError::Validation(blocking));
    }
    Ok(report.warnings().cloned().collect())
}

// ============================================================================
// Filesystem helpers
// ============================================================================

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn log_issues(path: &Path, issues: &[FormatIssue]) {
    for issue in issues {
        warn!("{}: {}", path.display(), issue);
    }
}

fn directory_of(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// `<path>.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

fn backup(path: &Path) -> Result<()> {
    let target = backup_path(path);
    std::fs::copy(path, &target)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), target.display()))?;
    info!("Backup written to {}", target.display());
    Ok(())
}

/// Contents written to a temporary file beside its target
struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    fn new(target: &Path, contents: &str) -> Result<Self> {
        let mut file = NamedTempFile::new_in(directory_of(target))
            .with_context(|| format!("Failed to create a temporary file for {}", target.display()))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to stage {}", target.display()))?;
        Ok(Self {
            file,
            target: target.to_path_buf(),
        })
    }
}

fn commit(staged: Vec<Staged>) -> Result<()> {
    for Staged { file, target } in staged {
        file.persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }
    Ok(())
}
