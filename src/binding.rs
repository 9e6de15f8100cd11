//! Header-caption based column binding.
//!
//! A header row is scanned once and every [`ColumnDefinition`] is mapped to
//! the 1-based column whose caption it matches. Data rows are then read with
//! [`read_columns`], which dispatches each bound column to the typed reader
//! of the definition's [`CellKind`].

use serde::Deserialize;
use tracing::debug;

use crate::error::{BindingFailure, Result, XlsxError};
use crate::excel::{CellKind, CellValue, WorksheetCursor};
use crate::options::ReaderOptions;

/// A column to locate by caption and read by kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    /// Header caption, or `|`-separated alternatives when `many_variant` is set.
    pub caption: String,
    pub kind: CellKind,
    /// Matching occurrences to pass over before binding.
    pub skip: usize,
    pub many_variant: bool,
    #[serde(skip)]
    resolved_index: usize,
    #[serde(skip)]
    remaining_skip: usize,
    #[serde(skip)]
    value: Option<CellValue>,
}

impl ColumnDefinition {
    pub fn new(caption: impl Into<String>, kind: CellKind) -> Self {
        Self {
            caption: caption.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Treat the caption as a `|`-separated list of accepted captions.
    pub fn many_variant(mut self) -> Self {
        self.many_variant = true;
        self
    }

    /// 1-based column bound by the last header pass, 0 when unbound.
    pub fn resolved_index(&self) -> usize {
        self.resolved_index
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_index != 0
    }

    /// Value read for this column by the last [`read_columns`] call.
    pub fn value(&self) -> Option<&CellValue> {
        self.value.as_ref()
    }

    pub fn take_value(&mut self) -> Option<CellValue> {
        self.value.take()
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.caption.split('|').map(str::trim).filter(|v| !v.is_empty())
    }

    fn matches_exact(&self, text: &str) -> bool {
        !self.many_variant && self.caption.trim().to_lowercase() == text
    }

    fn matches_variant(&self, text: &str) -> bool {
        self.many_variant && self.variants().any(|v| v.to_lowercase() == text)
    }

    fn reset_binding(&mut self) {
        self.resolved_index = 0;
        self.remaining_skip = self.skip;
    }
}

/// Header text as compared against captions.
fn normalize_caption(text: Option<String>) -> String {
    text.unwrap_or_default()
        .replace(['\r', '\n'], "")
        .trim()
        .to_lowercase()
}

fn effective_width(cursor: &WorksheetCursor<'_>, mismatch_column_count: Option<usize>) -> usize {
    cursor
        .column_count()
        .max(mismatch_column_count.unwrap_or_default())
}

fn all_resolved(definitions: &[ColumnDefinition]) -> bool {
    definitions.iter().all(ColumnDefinition::is_resolved)
}

/// Match one header cell. Exact captions are tried before variant lists.
fn bind_caption(definitions: &mut [ColumnDefinition], text: &str, column: usize) {
    let position = definitions
        .iter()
        .position(|d| !d.is_resolved() && d.matches_exact(text))
        .or_else(|| {
            definitions
                .iter()
                .position(|d| !d.is_resolved() && d.matches_variant(text))
        });
    let Some(index) = position else {
        return;
    };
    let definition = &mut definitions[index];
    if definition.remaining_skip == 0 {
        definition.resolved_index = column;
    } else {
        definition.remaining_skip -= 1;
    }
}

/// Scan the remaining cells of the current row. Returns true once every
/// definition is bound.
fn scan_header_row(
    cursor: &mut WorksheetCursor<'_>,
    definitions: &mut [ColumnDefinition],
    width: usize,
) -> Result<bool> {
    for _ in 0..width {
        let column = cursor.current_column();
        let text = normalize_caption(cursor.read_cell_as_string()?);
        bind_caption(definitions, &text, column);
        if all_resolved(definitions) {
            return Ok(true);
        }
    }
    Ok(all_resolved(definitions))
}

fn binding_result(cursor: &WorksheetCursor<'_>, definitions: &[ColumnDefinition]) -> Result<()> {
    let missing: Vec<String> = definitions
        .iter()
        .filter(|d| !d.is_resolved())
        .map(|d| d.caption.clone())
        .collect();
    if missing.is_empty() {
        debug!(
            sheet = cursor.sheet_name(),
            columns = definitions.len(),
            "header bound"
        );
        return Ok(());
    }
    debug!(sheet = cursor.sheet_name(), ?missing, "header binding failed");
    Err(XlsxError::Binding(BindingFailure::new(
        cursor.file_name(),
        missing,
    )))
}

/// Bind `definitions` against the cursor's current row.
///
/// Scans up to `max(column_count, mismatch_column_count)` cells. Any
/// previous binding is discarded first. Fails with [`XlsxError::Binding`]
/// listing every caption left unbound.
pub fn bind_columns(
    cursor: &mut WorksheetCursor<'_>,
    definitions: &mut [ColumnDefinition],
    mismatch_column_count: Option<usize>,
) -> Result<()> {
    definitions.iter_mut().for_each(ColumnDefinition::reset_binding);
    let width = effective_width(cursor, mismatch_column_count);
    scan_header_row(cursor, definitions, width)?;
    binding_result(cursor, definitions)
}

/// Bind across up to `depth` header rows starting at the current row.
///
/// The cursor moves to the next row between passes and stops on the row
/// where the last definition got bound. Each row is scanned over the same
/// width as [`bind_columns`].
pub fn bind_columns_multi_row(
    cursor: &mut WorksheetCursor<'_>,
    definitions: &mut [ColumnDefinition],
    depth: usize,
    mismatch_column_count: Option<usize>,
) -> Result<()> {
    if depth == 0 {
        return Err(XlsxError::Argument(
            "header depth cannot be zero".to_string(),
        ));
    }
    definitions.iter_mut().for_each(ColumnDefinition::reset_binding);
    let width = effective_width(cursor, mismatch_column_count);
    for level in 0..depth {
        if level > 0 && !cursor.move_to_next_row(true)? {
            break;
        }
        if scan_header_row(cursor, definitions, width)? {
            break;
        }
    }
    binding_result(cursor, definitions)
}

/// One text definition per non-empty caption of the current row.
///
/// Repeated captions keep `skip` at zero: the first unresolved definition
/// wins, so they bind to successive occurrences in order. Captions holding
/// `|` are left out.
pub fn header_definitions(
    cursor: &mut WorksheetCursor<'_>,
    mismatch_column_count: Option<usize>,
) -> Result<Vec<ColumnDefinition>> {
    let width = effective_width(cursor, mismatch_column_count);
    let mut definitions = Vec::new();
    for _ in 0..width {
        let Some(caption) = cursor.read_cell_as_string()? else {
            continue;
        };
        let caption = caption.replace(['\r', '\n'], "").trim().to_string();
        if caption.is_empty() || caption.contains('|') {
            continue;
        }
        definitions.push(ColumnDefinition::new(caption, CellKind::String));
    }
    Ok(definitions)
}

/// Read the current row into the bound definitions.
///
/// Returns true when every definition received a value.
pub fn read_columns(
    cursor: &mut WorksheetCursor<'_>,
    definitions: &mut [ColumnDefinition],
    options: &ReaderOptions,
    mismatch_column_count: Option<usize>,
) -> Result<bool> {
    for definition in definitions.iter_mut() {
        definition.value = None;
    }

    let width = effective_width(cursor, mismatch_column_count);
    for column in 1..=width {
        match definitions.iter_mut().find(|d| d.resolved_index == column) {
            Some(definition) => {
                definition.value = cursor.read_cell_as(definition.kind, options)?;
            }
            None => {
                if !cursor.skip_cells(1)? {
                    break;
                }
            }
        }
    }

    Ok(definitions.iter().all(|d| d.value.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(captions: &[&str]) -> Vec<ColumnDefinition> {
        captions
            .iter()
            .map(|c| ColumnDefinition::new(*c, CellKind::String))
            .collect()
    }

    fn bind_row(definitions: &mut [ColumnDefinition], header: &[&str]) {
        definitions.iter_mut().for_each(ColumnDefinition::reset_binding);
        for (i, text) in header.iter().enumerate() {
            bind_caption(definitions, &normalize_caption(Some(text.to_string())), i + 1);
        }
    }

    #[test]
    fn exact_captions_ignore_case_and_line_breaks() {
        let mut definitions = defs(&["Name", "Amount"]);
        bind_row(&mut definitions, &["  NAME ", "Amo\nunt"]);
        assert_eq!(definitions[0].resolved_index(), 1);
        assert_eq!(definitions[1].resolved_index(), 2);
    }

    #[test]
    fn skip_passes_over_earlier_occurrences() {
        let mut definitions = vec![ColumnDefinition::new("Total", CellKind::Decimal).with_skip(1)];
        bind_row(&mut definitions, &["Total", "Total", "Total"]);
        assert_eq!(definitions[0].resolved_index(), 2);

        // A second pass starts from the configured skip again.
        bind_row(&mut definitions, &["x", "Total", "Total"]);
        assert_eq!(definitions[0].resolved_index(), 3);
    }

    #[test]
    fn variants_are_consulted_after_exact_captions() {
        let mut definitions = vec![
            ColumnDefinition::new("Qty|Count", CellKind::Integer).many_variant(),
            ColumnDefinition::new("Count", CellKind::Integer),
        ];
        bind_row(&mut definitions, &["count", "QTY"]);
        assert_eq!(definitions[1].resolved_index(), 1);
        assert_eq!(definitions[0].resolved_index(), 2);
    }

    #[test]
    fn first_unresolved_definition_wins() {
        let mut definitions = defs(&["Code", "Code"]);
        bind_row(&mut definitions, &["Code", "Code"]);
        assert_eq!(definitions[0].resolved_index(), 1);
        assert_eq!(definitions[1].resolved_index(), 2);
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout = r#"[
            {"caption": "Name"},
            {"caption": "Sum|Total", "kind": "decimal", "many_variant": true},
            {"caption": "When", "kind": "datetime", "skip": 2}
        ]"#;
        let definitions: Vec<ColumnDefinition> = serde_json::from_str(layout).unwrap();
        assert_eq!(definitions[0].kind, CellKind::String);
        assert!(definitions[1].many_variant);
        assert_eq!(
            definitions[1].variants().collect::<Vec<_>>(),
            vec!["Sum", "Total"]
        );
        assert_eq!(definitions[2].kind, CellKind::DateTime);
        assert_eq!(definitions[2].skip, 2);
        assert!(!definitions[2].is_resolved());
    }
}
