//! Whole-file properties of the dump format.
//!
//! The input below is deliberately ragged: mixed indentation, no padding,
//! escaped quotes, commas inside strings, a comment line and the legacy
//! `data` table shape.

use pretty_assertions::assert_eq;
use tabular_text::{parse, realign, serialize, AlignmentPolicy, Value};

const RAGGED_DUMP: &str = r#"{
  "DevProfiles": {
    "columns": ["ProfileName", "StructName"],
    "rows": [
      ["MC80", "wvar"]
    ]
  },
  // exported from the parameter database
  "DevParams": {
    "columns": ["Category", "SubNumber", "Variable_name", "Variable_type", "ParameterDescription", "DefaultValue", "format"],
    "rows": [
      ["CAT_SPEED", 1, "MotorSpeed", "tint16u", "Motor speed, rpm", 1500, "%d"],
      ["CAT_SPEED", 2, "RampTime", "tfloat", "Ramp \"soft\" time", 0.25, "%0.2f"],
        ["CAT_NET", 1, "DeviceName", "tstring", "Name", null, "%s"]
    ]
  },
  "Selectors": {
    "columns": ["Selector_name", "Selector_description"],
    "rows": []
  },
  "Settings": {
    "columns": ["key", "value"],
    "data": {
      "revision": 7,
      "enabled": true
    }
  }
}
"#;

#[test]
fn test_serialize_is_idempotent() {
    let policy = AlignmentPolicy::default();
    let first = serialize(&parse(RAGGED_DUMP).unwrap().document, &policy);
    let second = serialize(&parse(&first).unwrap().document, &policy);
    assert_eq!(first, second);
}

#[test]
fn test_realign_is_idempotent() {
    let policy = AlignmentPolicy::default();
    let once = realign(RAGGED_DUMP, &policy);
    assert!(once.issues.is_empty(), "{:?}", once.issues);
    assert_eq!(once.blocks_aligned, 2);

    let twice = realign(&once.text, &policy);
    assert_eq!(once.text, twice.text);
}

#[test]
fn test_realign_keeps_content() {
    let before = parse(RAGGED_DUMP).unwrap();
    let after = parse(&realign(RAGGED_DUMP, &AlignmentPolicy::default()).text).unwrap();
    assert!(after.is_clean(), "{:?}", after.issues);
    assert_eq!(before.document, after.document);
}

#[test]
fn test_serialized_output_is_already_aligned() {
    let policy = AlignmentPolicy::default();
    let written = serialize(&parse(RAGGED_DUMP).unwrap().document, &policy);
    assert_eq!(realign(&written, &policy).text, written);
}

#[test]
fn test_first_cell_starts_under_first_header() {
    let written = serialize(
        &parse(RAGGED_DUMP).unwrap().document,
        &AlignmentPolicy::default(),
    );
    let header = written
        .lines()
        .find(|l| l.contains("\"Variable_name\""))
        .unwrap();
    let row = written
        .lines()
        .find(|l| l.contains("\"MotorSpeed"))
        .unwrap();
    assert_eq!(header.find("\"Category"), row.find("\"CAT_SPEED"));
}

#[test]
fn test_string_escapes_survive() {
    let doc = parse(RAGGED_DUMP).unwrap().document;
    let params = doc.get("DevParams").unwrap();
    let index = params.column_index();
    let descriptions: Vec<&str> = params
        .rows()
        .iter()
        .filter_map(|row| index.record(row).str("ParameterDescription"))
        .collect();
    assert_eq!(
        descriptions,
        vec!["Motor speed, rpm", "Ramp \"soft\" time", "Name"]
    );
    assert_eq!(index.record(&params.rows()[1]).get("DefaultValue"), Some(&Value::Float(0.25)));
}

#[test]
fn test_compact_policy_round_trips_content() {
    let doc = parse(RAGGED_DUMP).unwrap().document;
    let compact = serialize(&doc, &AlignmentPolicy::compact());
    assert!(compact.contains("[ \"CAT_SPEED\", 1, \"MotorSpeed\""));
    assert_eq!(parse(&compact).unwrap().document, doc);
}
