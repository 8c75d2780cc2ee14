//! End-to-end runs over dumps on disk.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use paramsdb_gen::run::{self, backup_path};
use paramsdb_gen::{checksum16, emit, DeviceProfile, GenerateError, GeneratorConfig};

const MINIMAL_DUMP: &str = r#"{
"DevParamTree": {
"columns": ["Category", "Parent", "Description"],
"rows": [
["CAT_SPEED", null, "Speed"]
]
},
"DevParams": {
"columns": ["Category", "SubNumber", "Variable_name", "Variable_type", "format"],
"rows": [
["CAT_SPEED", 1, "MotorSpeed", "tint16u", "%d"]
]
}
}
"#;

fn write_dump(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("ParamsDB.txt");
    fs::write(&path, text).unwrap();
    path
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim_end).collect()
}

#[test]
fn test_minimal_profile_renders() {
    let parsed = tabular_text::parse(MINIMAL_DUMP).unwrap();
    let (profile, diagnostics) = DeviceProfile::from_document(&parsed.document).unwrap();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let artifacts = emit::generate(&profile, &Default::default()).unwrap();
    assert_eq!(artifacts.header_name, "MC80_Params.h");
    assert_eq!(artifacts.source_name, "MC80_Params.c");

    let header = lines(&artifacts.header);
    assert_eq!(header[0], "#ifndef MC80_PARAMS_H");
    assert!(header.contains(&"#define CAT_SPEED 0"));
    assert!(header.iter().any(|l| l.trim_start().starts_with("uint16_t MotorSpeed;")));
    assert_eq!(header.last(), Some(&"#endif // MC80_PARAMS_H"));

    let source = lines(&artifacts.source);
    assert!(source.contains(&"#define WVAR_SIZE 1"));
    assert!(source.contains(&"#define SELECTORS_NUM 0"));
    let hash_line = format!("  {{0x{:04X},  0}}  // MotorSpeed", checksum16("MotorSpeed"));
    assert!(source.contains(&hash_line.as_str()), "{}", artifacts.source);
    assert!(artifacts.source.ends_with("};\n"));
}

#[test]
fn test_generate_writes_sources_and_realigns_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dump(dir.path(), MINIMAL_DUMP);

    let outcome = run::generate(&input, &GeneratorConfig::default()).unwrap();
    assert!(outcome.input_rewritten);
    assert_eq!(outcome.header_path, dir.path().join("MC80_Params.h"));
    assert!(outcome.header_path.is_file());
    assert!(outcome.source_path.is_file());

    // original text preserved in the backup, aligned text in place
    assert_eq!(fs::read_to_string(backup_path(&input)).unwrap(), MINIMAL_DUMP);
    let aligned = fs::read_to_string(&input).unwrap();
    assert_ne!(aligned, MINIMAL_DUMP);
    assert_eq!(
        tabular_text::parse(&aligned).unwrap().document,
        tabular_text::parse(MINIMAL_DUMP).unwrap().document
    );

    // second run finds nothing to re-align
    fs::remove_file(backup_path(&input)).unwrap();
    let again = run::generate(&input, &GeneratorConfig::default()).unwrap();
    assert!(!again.input_rewritten);
    assert!(!backup_path(&input).exists());
}

#[test]
fn test_generate_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dump(dir.path(), &MINIMAL_DUMP.replace("tint16u", "tbogus"));

    let err = run::generate(&input, &GeneratorConfig::default()).unwrap_err();
    assert!(err.downcast_ref::<GenerateError>().is_some());

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["ParamsDB.txt".to_string()]);
}

#[test]
fn test_fatal_warnings_stop_generation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dump(dir.path(), &MINIMAL_DUMP.replace("%d", "%s"));

    // %s on an unsigned type only warns by default
    let outcome = run::generate(&input, &GeneratorConfig::default()).unwrap();
    assert!(outcome.diagnostics.iter().any(|d| d.is_warning()));

    fs::write(dir.path().join("paramsdb.yaml"), "warnings_fatal: true\n").unwrap();
    let config = GeneratorConfig::for_input(&input).unwrap();
    let err = run::generate(&input, &config).unwrap_err();
    let generate = err.downcast_ref::<GenerateError>().unwrap();
    assert_eq!(generate.diagnostics().len(), 1);
}

#[test]
fn test_check_reports_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dump(dir.path(), &MINIMAL_DUMP.replace("%d", "%f"));

    let report = run::check(&input).unwrap();
    assert_eq!(report.total_params, 1);
    assert!(!report.is_consistent());
    // check never rewrites
    assert_eq!(fs::read_to_string(&input).unwrap(), MINIMAL_DUMP.replace("%d", "%f"));
}

#[test]
fn test_align_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dump(dir.path(), MINIMAL_DUMP);

    let first = run::align(&input, &GeneratorConfig::default()).unwrap();
    assert!(first.changed);
    assert_eq!(first.blocks_aligned, 2);
    assert!(backup_path(&input).is_file());

    let second = run::align(&input, &GeneratorConfig::default()).unwrap();
    assert!(!second.changed);
}

#[test]
fn test_import_then_generate() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export.json");
    fs::write(
        &export,
        r#"{
  "DevProfiles": {"columns": ["ID", "ProfileName", "StructName"], "rows": [[1, "MC80", "wvar"]]},
  "DevParamTree": {
    "columns": ["ID", "ProfileID", "CategoryName", "Parent", "Description"],
    "rows": [[10, 1, "CAT_SPEED", null, "Speed"]]
  },
  "DevVarTypes": {"columns": ["ID", "VarTypeName", "C_type"], "rows": [[3, "tint16u", "uint16_t"]]},
  "DevParams": {
    "columns": ["ID", "sublevel", "SubNumber", "Parameter_variable_name", "ParameterType", "ParameterName", "format"],
    "rows": [[100, 10, 7, "MotorSpeed", 3, "Motor speed", "%d"]]
  }
}"#,
    )
    .unwrap();
    let output = dir.path().join("ParamsDB.txt");
    let config = GeneratorConfig::default();

    let outcome = run::import(&export, &output, &config, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(outcome.tables, 4);
    assert!(!backup_path(&output).exists());

    let doc = tabular_text::parse(&fs::read_to_string(&output).unwrap())
        .unwrap()
        .document;
    let params = doc.get("DevParams").unwrap();
    assert_eq!(params.columns[0], "Category");
    assert!(params.has_column("ParameterAlias"));
    assert!(!params.has_column("ID"));

    let generated = run::generate(&output, &config).unwrap();
    let header = fs::read_to_string(generated.header_path).unwrap();
    assert!(header.contains("#define CAT_SPEED 0"));

    // importing again keeps the previous dump as a backup
    run::import(&export, &output, &config, &mut StdRng::seed_from_u64(7)).unwrap();
    assert!(backup_path(&output).is_file());
}
