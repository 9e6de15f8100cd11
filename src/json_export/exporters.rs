use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::binding::{ColumnDefinition, read_columns};
use crate::excel::WorksheetCursor;
use crate::json_export::converters::cell_value_to_json;
use crate::json_export::types::OrderedRows;
use crate::options::ReaderOptions;

pub fn serialize_to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize data to JSON")
}

pub fn write_json_to_file<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;

    let json_string = serialize_to_json(data)?;

    file.write_all(json_string.as_bytes())
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    Ok(())
}

// Key used for a definition's column in the exported object
fn column_key(definition: &ColumnDefinition) -> String {
    if definition.many_variant {
        definition
            .variants()
            .next()
            .unwrap_or_default()
            .to_string()
    } else {
        definition.caption.trim().to_string()
    }
}

// Repeated keys get a `_<column>` suffix, extended further while it names
// another column
fn column_keys(definitions: &[ColumnDefinition]) -> Vec<String> {
    let base: Vec<String> = definitions.iter().map(column_key).collect();
    let mut keys: Vec<String> = Vec::with_capacity(definitions.len());
    for (key, definition) in base.iter().zip(definitions) {
        if !keys.contains(key) {
            keys.push(key.clone());
            continue;
        }
        let stem = format!("{key}_{}", definition.resolved_index());
        let mut candidate = stem.clone();
        let mut n = 1;
        while keys.contains(&candidate) || base.contains(&candidate) {
            n += 1;
            candidate = format!("{stem}_{n}");
        }
        keys.push(candidate);
    }
    keys
}

/// Read every remaining row of a bound cursor into ordered JSON objects.
///
/// Rows where no bound column has a value are left out.
pub fn export_rows(
    cursor: &mut WorksheetCursor<'_>,
    definitions: &mut [ColumnDefinition],
    options: &ReaderOptions,
    mismatch_column_count: Option<usize>,
) -> crate::Result<OrderedRows> {
    let keys = column_keys(definitions);
    let mut rows = Vec::new();

    while cursor.move_to_next_row(true)? {
        read_columns(cursor, definitions, options, mismatch_column_count)?;
        if definitions.iter().all(|d| d.value().is_none()) {
            continue;
        }

        let mut row_data = IndexMap::with_capacity(definitions.len());
        for (key, definition) in keys.iter().zip(definitions.iter()) {
            row_data.insert(key.clone(), cell_value_to_json(definition.value()));
        }
        rows.push(row_data);
    }

    Ok(rows)
}
