mod common;

use common::{FixtureBook, inline, row};
use serde_json::{Value, json};
use xlsx_cursor::json_export::{WorkbookExport, export_rows, serialize_to_json, write_json_to_file};
use xlsx_cursor::{CellKind, ColumnDefinition, ReaderOptions, bind_columns};

fn names_and_amounts() -> FixtureBook {
    let rows = [
        row(
            1,
            &[
                inline("A1", "Name"),
                inline("B1", "Amount"),
                inline("C1", "Note"),
            ],
        ),
        row(2, &[inline("A2", "Alpha"), inline("B2", "100.50")]),
        row(3, &[inline("A3", "Beta"), inline("B3", "")]),
        // Row 4 is absent and row 5 only fills an unbound column.
        row(5, &[inline("C5", "memo")]),
    ]
    .concat();
    FixtureBook::new().sheet("Data", Some("A1:C5"), &rows)
}

fn export(book: &FixtureBook) -> WorkbookExport {
    let mut workbook = book.open();
    let mut cursor = workbook.open_worksheet("Data").unwrap();
    let mut definitions = vec![
        ColumnDefinition::new("Name", CellKind::String),
        ColumnDefinition::new("Amount", CellKind::Decimal),
    ];
    assert!(cursor.move_to_next_row(false).unwrap());
    bind_columns(&mut cursor, &mut definitions, None).unwrap();

    let rows = export_rows(&mut cursor, &mut definitions, &ReaderOptions::default(), None).unwrap();
    let mut export = WorkbookExport::new();
    export.insert(cursor.sheet_name().to_string(), rows);
    export
}

#[test]
fn rows_export_with_nulls_and_without_empty_rows() {
    let export = export(&names_and_amounts());
    let rows = &export["Data"];

    assert_eq!(
        serde_json::to_value(rows).unwrap(),
        json!([
            {"Name": "Alpha", "Amount": 100.5},
            {"Name": "Beta", "Amount": null}
        ])
    );
    assert_eq!(
        rows[0].keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["Name", "Amount"]
    );
}

#[test]
fn json_is_written_to_disk_in_column_order() {
    let export = export(&names_and_amounts());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");

    write_json_to_file(&export, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, serialize_to_json(&export).unwrap());
    assert!(text.find("\"Name\"").unwrap() < text.find("\"Amount\"").unwrap());

    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["Data"][1], json!({"Name": "Beta", "Amount": null}));
}

#[test]
fn writing_into_a_missing_directory_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("export.json");

    let err = write_json_to_file(&WorkbookExport::new(), &path).unwrap_err();
    assert!(err.to_string().contains("Failed to create file"));
}
