//! Generator configuration
//!
//! Loads the optional `paramsdb.yaml` that sits next to the dump and finds
//! the dump itself when no path is given on the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tabular_text::AlignmentPolicy;
use tracing::{debug, info};

use crate::emit::EmitOptions;
use crate::profile::ProfileDefaults;

pub const CONFIG_FILE: &str = "paramsdb.yaml";
pub const DEFAULT_INPUT: &str = "ParamsDB.txt";
pub const INPUT_ENV: &str = "PARAMSDB_FILE";

/// Everything a run can be tuned with; every field has a default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub emit: EmitOptions,
    pub alignment: AlignmentPolicy,
    pub profile: ProfileDefaults,
    /// Treat format warnings from the consistency check as errors
    pub warnings_fatal: bool,
}

impl GeneratorConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse generator configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!("Loaded generator configuration from {}", path.display());
        Ok(config)
    }

    /// `paramsdb.yaml` in the directory of `input`, or defaults when absent
    pub fn for_input(input: &Path) -> Result<Self> {
        let path = input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            debug!("No {} next to {}, using defaults", CONFIG_FILE, input.display());
            Ok(Self::default())
        }
    }
}

/// Locate the dump when no path was given.
///
/// Resolution order:
/// 1. `PARAMSDB_FILE` environment variable
/// 2. `ParamsDB.txt` in the current directory
/// 3. `ParamsDB.txt` next to the running executable
pub fn discover_input() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(INPUT_ENV) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(DEFAULT_INPUT);
    if local.is_file() {
        return Some(local);
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_INPUT)))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_standard_output() {
        let config = GeneratorConfig::default();
        assert_eq!(config.emit.include, "App.h");
        assert_eq!(config.profile.profile_name, "MC80");
        assert_eq!(config.profile.struct_name, "wvar");
        assert!(config.alignment.pad_columns);
        assert!(!config.warnings_fatal);
    }

    #[test]
    fn test_partial_yaml() {
        let config = GeneratorConfig::from_yaml_str(
            "emit:\n  include: Board.h\nalignment:\n  pad_columns: false\nwarnings_fatal: true\n",
        )
        .unwrap();
        assert_eq!(config.emit.include, "Board.h");
        assert!(!config.alignment.pad_columns);
        assert_eq!(config.alignment.header_indent, 4);
        assert_eq!(config.profile.struct_name, "wvar");
        assert!(config.warnings_fatal);
    }

    #[test]
    fn test_config_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(DEFAULT_INPUT);
        assert_eq!(GeneratorConfig::for_input(&input).unwrap(), GeneratorConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "profile:\n  struct_name: pvar\n").unwrap();
        let config = GeneratorConfig::for_input(&input).unwrap();
        assert_eq!(config.profile.struct_name, "pvar");
        assert_eq!(config.profile.profile_name, "MC80");
    }

    #[test]
    fn test_bad_yaml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "warnings_fatal: [").unwrap();
        let err = GeneratorConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains(CONFIG_FILE));
    }
}
