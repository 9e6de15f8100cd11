#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use xlsx_cursor::Workbook;
use zip::ZipWriter;
use zip::write::FileOptions;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Hand-authored xlsx package: worksheet XML is written verbatim so tests can
/// exercise gaps, inline strings and odd row numbers.
pub struct FixtureBook {
    sheets: Vec<FixtureSheet>,
    shared_strings: Option<Vec<String>>,
    date1904: bool,
}

struct FixtureSheet {
    name: String,
    dimension: Option<String>,
    rows: String,
    raw: Option<Vec<u8>>,
}

impl FixtureBook {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: None,
            date1904: false,
        }
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Add a sheet whose `<sheetData>` content is `rows`.
    pub fn sheet(mut self, name: &str, dimension: Option<&str>, rows: &str) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_string(),
            dimension: dimension.map(str::to_string),
            rows: rows.to_string(),
            raw: None,
        });
        self
    }

    /// Add a sheet whose whole worksheet part is `xml`, byte for byte.
    pub fn raw_sheet(mut self, name: &str, xml: &[u8]) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_string(),
            dimension: None,
            rows: String::new(),
            raw: Some(xml.to_vec()),
        });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let mut put = |name: &str, content: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content).unwrap();
        };

        put(
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            )
            .as_bytes(),
        );

        let mut sheets = String::new();
        let mut rels = String::new();
        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            sheets.push_str(&format!(
                r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
                sheet.name
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
        }
        if self.shared_strings.is_some() {
            rels.push_str(&format!(
                r#"<Relationship Id="rIdSst" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
        }

        let workbook_pr = if self.date1904 {
            r#"<workbookPr date1904="1"/>"#
        } else {
            "<workbookPr/>"
        };
        put(
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{workbook_pr}<sheets>{sheets}</sheets></workbook>"#
            )
            .as_bytes(),
        );
        put(
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#
            )
            .as_bytes(),
        );

        if let Some(strings) = &self.shared_strings {
            let items: String = strings
                .iter()
                .map(|s| format!("<si><t>{s}</t></si>"))
                .collect();
            put(
                "xl/sharedStrings.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                    strings.len()
                )
                .as_bytes(),
            );
        }

        for (i, sheet) in self.sheets.iter().enumerate() {
            let part = format!("xl/worksheets/sheet{}.xml", i + 1);
            if let Some(raw) = &sheet.raw {
                put(&part, raw);
                continue;
            }
            let dimension = sheet
                .dimension
                .as_ref()
                .map(|r| format!(r#"<dimension ref="{r}"/>"#))
                .unwrap_or_default();
            put(
                &part,
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{dimension}<sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData>{}</sheetData></worksheet>"#,
                    sheet.rows
                )
                .as_bytes(),
            );
        }

        zip.finish().unwrap().into_inner()
    }

    pub fn open(&self) -> Workbook<Cursor<Vec<u8>>> {
        Workbook::from_reader(Cursor::new(self.to_bytes()), "fixture.xlsx").unwrap()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).unwrap();
    }
}

/// `<c>` holding a shared string index.
pub fn shared(reference: &str, index: usize) -> String {
    format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#)
}

/// `<c>` holding an inline string.
pub fn inline(reference: &str, text: &str) -> String {
    format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

/// `<c>` holding a number.
pub fn number(reference: &str, value: &str) -> String {
    format!(r#"<c r="{reference}"><v>{value}</v></c>"#)
}

/// `<row>` with the given cells.
pub fn row(number: usize, cells: &[String]) -> String {
    format!(r#"<row r="{number}">{}</row>"#, cells.concat())
}
