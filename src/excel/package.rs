use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Result, XlsxError};
use crate::excel::cursor::WorksheetCursor;
use crate::excel::xml::{attr_value, push_text};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SHARED_STRINGS_REL: &str = "/sharedStrings";

/// Selects a worksheet by 1-based position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for WorksheetSelector {
    fn from(index: usize) -> Self {
        WorksheetSelector::Index(index)
    }
}

impl From<&str> for WorksheetSelector {
    fn from(name: &str) -> Self {
        WorksheetSelector::Name(name.to_string())
    }
}

impl From<String> for WorksheetSelector {
    fn from(name: String) -> Self {
        WorksheetSelector::Name(name)
    }
}

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    path: String,
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// An open xlsx package: sheet catalog and shared strings are read once,
/// worksheets are streamed on demand.
pub struct Workbook<RS = BufReader<File>> {
    file_name: String,
    archive: ZipArchive<RS>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    is_1904: bool,
}

impl Workbook<BufReader<File>> {
    /// Open a workbook file for reading. The file is opened read-only, so it
    /// can stay open in another process.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path.to_string_lossy())
    }
}

impl<RS: Read + Seek> Workbook<RS> {
    /// Read a workbook from any seekable source. `file_name` is only used in
    /// diagnostics.
    pub fn from_reader(reader: RS, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        let mut archive = ZipArchive::new(reader)?;

        let root_rels = read_relationships(&mut archive, "_rels/.rels")?;
        let workbook_part = root_rels
            .iter()
            .find(|rel| rel.rel_type.ends_with(OFFICE_DOCUMENT_REL))
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());

        let Some(workbook_xml) = read_part(&mut archive, &workbook_part)? else {
            return Err(XlsxError::InvalidPackage {
                file: file_name,
                reason: format!("missing part {workbook_part}"),
            });
        };

        let workbook_rels = read_relationships(&mut archive, &rels_part_for(&workbook_part))?;
        let (sheets, is_1904) = parse_workbook(&workbook_xml, &workbook_part, &workbook_rels)?;
        if sheets.is_empty() {
            return Err(XlsxError::InvalidPackage {
                file: file_name,
                reason: "workbook has no worksheets".to_string(),
            });
        }

        let shared_strings_part = workbook_rels
            .iter()
            .find(|rel| rel.rel_type.ends_with(SHARED_STRINGS_REL))
            .map(|rel| resolve_target(&workbook_part, &rel.target))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS_PART.to_string());
        let shared_strings = load_shared_strings(&mut archive, &shared_strings_part)?;

        debug!(
            file = %file_name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            "opened workbook"
        );

        Ok(Self {
            file_name,
            archive,
            sheets,
            shared_strings,
            is_1904,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn shared_strings(&self) -> &[String] {
        &self.shared_strings
    }

    /// True when dates are stored against the 1904 epoch.
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// Open a worksheet for forward-only reading. Unknown selectors fail with
    /// [`XlsxError::NotFound`].
    pub fn open_worksheet(
        &mut self,
        selector: impl Into<WorksheetSelector>,
    ) -> Result<WorksheetCursor<'_>> {
        let selector = selector.into();
        let Some(index) = self.find_sheet(&selector) else {
            let selector = match selector {
                WorksheetSelector::Index(i) => format!("#{i}"),
                WorksheetSelector::Name(name) => format!("\"{name}\""),
            };
            return Err(XlsxError::NotFound {
                selector,
                file: self.file_name.clone(),
            });
        };
        self.open_sheet_at(index)
    }

    /// Like [`Workbook::open_worksheet`] by name, but a missing sheet yields
    /// `Ok(None)`.
    pub fn try_open_worksheet_by_name(&mut self, name: &str) -> Result<Option<WorksheetCursor<'_>>> {
        match self.find_sheet(&WorksheetSelector::from(name)) {
            Some(index) => self.open_sheet_at(index).map(Some),
            None => Ok(None),
        }
    }

    fn find_sheet(&self, selector: &WorksheetSelector) -> Option<usize> {
        match selector {
            WorksheetSelector::Index(i) => (1..=self.sheets.len()).contains(i).then(|| i - 1),
            WorksheetSelector::Name(name) => {
                let wanted = name.to_lowercase();
                self.sheets
                    .iter()
                    .position(|s| s.name.to_lowercase() == wanted)
            }
        }
    }

    fn open_sheet_at(&mut self, index: usize) -> Result<WorksheetCursor<'_>> {
        let SheetEntry { name, path } = self.sheets[index].clone();
        let entry = match self.archive.by_name(&path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(XlsxError::InvalidPackage {
                    file: self.file_name.clone(),
                    reason: format!("worksheet part {path} is missing"),
                });
            }
            Err(e) => return Err(e.into()),
        };
        debug!(sheet = %name, part = %path, "opening worksheet");
        WorksheetCursor::open(
            entry,
            &self.shared_strings,
            &self.file_name,
            name,
            self.is_1904,
        )
    }
}

fn read_part<RS: Read + Seek>(archive: &mut ZipArchive<RS>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn read_relationships<RS: Read + Seek>(
    archive: &mut ZipArchive<RS>,
    name: &str,
) -> Result<Vec<Relationship>> {
    let Some(xml) = read_part(archive, name)? else {
        return Ok(Vec::new());
    };

    let mut reader = XmlReader::from_str(&xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(tag) | Event::Empty(tag)
                if tag.local_name().as_ref() == b"Relationship" =>
            {
                let (Some(id), Some(target)) =
                    (attr_value(&tag, b"Id")?, attr_value(&tag, b"Target")?)
                else {
                    continue;
                };
                let rel_type = attr_value(&tag, b"Type")?.unwrap_or_default();
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn parse_workbook(
    xml: &str,
    workbook_part: &str,
    rels: &[Relationship],
) -> Result<(Vec<SheetEntry>, bool)> {
    let mut reader = XmlReader::from_str(xml);
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    loop {
        match reader.read_event()? {
            Event::Start(tag) | Event::Empty(tag) => match tag.local_name().as_ref() {
                b"workbookPr" => {
                    is_1904 = matches!(
                        attr_value(&tag, b"date1904")?.as_deref(),
                        Some("1" | "true")
                    );
                }
                b"sheet" => {
                    let (Some(name), Some(rid)) =
                        (attr_value(&tag, b"name")?, attr_value(&tag, b"id")?)
                    else {
                        continue;
                    };
                    let Some(rel) = rels.iter().find(|rel| rel.id == rid) else {
                        warn!(sheet = %name, rid = %rid, "sheet has no relationship, skipped");
                        continue;
                    };
                    sheets.push(SheetEntry {
                        name,
                        path: resolve_target(workbook_part, &rel.target),
                    });
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((sheets, is_1904))
}

fn load_shared_strings<RS: Read + Seek>(
    archive: &mut ZipArchive<RS>,
    part: &str,
) -> Result<Vec<String>> {
    let entry = match archive.by_name(part) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            debug!(part, "workbook has no shared strings part");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = XmlReader::from_reader(BufReader::new(entry));
    let mut buf = Vec::with_capacity(1024);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = phonetic_depth == 0,
                _ => {}
            },
            Event::Empty(tag) if tag.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::End(tag) => match tag.local_name().as_ref() {
                b"si" => {
                    if let Some(text) = current.take() {
                        strings.push(text);
                    }
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            other => {
                if in_text && let Some(text) = current.as_mut() {
                    push_text(other, text)?;
                }
            }
        }
    }
    Ok(strings)
}

/// Relationship part for `part`: `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`.
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut base = PathBuf::from(base_part);
    base.pop();
    for segment in target.split('/').filter(|s| !s.is_empty()) {
        base.push(segment);
    }
    normalize_path(&base)
}

fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(s) => parts.push(s.to_string_lossy().to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_resolve_against_the_workbook_part() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "../custom/sheet.xml"),
            "custom/sheet.xml"
        );
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn rels_part_names() {
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_part_for("workbook.xml"), "_rels/workbook.xml.rels");
    }
}
