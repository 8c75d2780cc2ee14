//! paramsdb-gen: Parameter database to firmware C generator
//!
//! Turns the column-aligned `ParamsDB.txt` dump into the `<PROFILE>_Params.h`
//! and `<PROFILE>_Params.c` pair compiled into the device firmware:
//! - Schema transform pipeline for raw database exports (`transform`)
//! - CRC-16 name checksums and the sorted lookup index (`checksum`)
//! - Format/type consistency checks (`check`)
//! - Validated device profile model (`profile`)
//! - C header/source emitter (`emit`)
//! - Configuration and file workflows (`config`, `run`)
//!
//! Reading and writing the dump itself lives in the `tabular-text` crate.

pub mod check;
pub mod checksum;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod profile;
pub mod run;
pub mod transform;

// Re-export commonly used types
pub use check::{check_format, check_profile, CheckReport, FormatSpec, FormatVerdict};
pub use checksum::{checksum16, ChecksumIndex, CollisionReport, NOT_FOUND};
pub use config::GeneratorConfig;
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use emit::{render, Artifacts, EmitOptions};
pub use error::{GenerateError, TransformError};
pub use profile::{DeviceProfile, VarType};
pub use transform::{import_export, make_alias, Lookups, Pipeline};
