mod common;

use std::process::Command;

use common::{FixtureBook, inline, number, row};
use serde_json::{Value, json};

fn xlsx_cursor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xlsx-cursor"))
}

#[test]
fn default_layout_exports_repeated_captions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.xlsx");
    let rows = [
        row(1, &[inline("A1", "Qty"), inline("B1", "Qty")]),
        row(2, &[number("A2", "1"), number("B2", "2")]),
    ]
    .concat();
    FixtureBook::new()
        .sheet("Data", Some("A1:B2"), &rows)
        .write_to(&path);

    let output = xlsx_cursor().arg(&path).output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let exported: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(exported, json!({"Data": [{"Qty": "1", "Qty_2": "2"}]}));
}

#[test]
fn missing_layout_captions_exit_with_code_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.xlsx");
    let layout = dir.path().join("layout.json");
    FixtureBook::new()
        .sheet("Data", Some("A1"), &row(1, &[inline("A1", "Name")]))
        .write_to(&path);
    std::fs::write(&layout, r#"[{"caption": "Name"}, {"caption": "Amount"}]"#).unwrap();

    let output = xlsx_cursor()
        .arg(&path)
        .arg("--layout")
        .arg(&layout)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.trim_end().ends_with("Amount"), "stderr: {stderr}");
}
