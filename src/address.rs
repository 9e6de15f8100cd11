//! A1-style cell reference codec.
//!
//! Columns use bijective base-26 (no zero digit): 1 is `A`, 26 is `Z`,
//! 27 is `AA`. Everything here is 1-based.

use std::fmt;

use crate::error::{Result, XlsxError};

pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_ROWS: usize = 1_048_576;

#[must_use]
fn column_out_of_range(index: usize) -> XlsxError {
    XlsxError::Range(format!(
        "column index {index} is out of range (1...{MAX_COLUMNS})"
    ))
}

pub fn index_to_column_name(index: usize) -> Result<String> {
    if !(1..=MAX_COLUMNS).contains(&index) {
        return Err(column_out_of_range(index));
    }

    let mut letters = Vec::with_capacity(3);
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        letters.push(b'A' + remainder as u8);
        n = (n - remainder) / 26;
    }

    letters.reverse();
    Ok(letters.into_iter().map(char::from).collect())
}

pub fn column_name_to_index(name: &str) -> Result<usize> {
    if name.is_empty() {
        return Err(XlsxError::Range("column name is empty".to_string()));
    }

    let mut sum = 0usize;

    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(XlsxError::Range(format!(
                "column name \"{name}\" contains a non-letter character"
            )));
        }

        let val = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        sum = sum * 26 + val;

        // Bail out before overflowing on absurdly long names.
        if sum > MAX_COLUMNS {
            return Err(column_out_of_range(sum));
        }
    }

    Ok(sum)
}

/// Format a reference such as `C7` from 1-based row and column.
pub fn cell_reference(row: usize, column: usize) -> Result<String> {
    if !(1..=MAX_ROWS).contains(&row) {
        return Err(XlsxError::Range(format!(
            "row index {row} is out of range (1...{MAX_ROWS})"
        )));
    }

    Ok(format!("{}{}", index_to_column_name(column)?, row))
}

/// Leading letters of a reference (`"AB12"` gives `"AB"`), upper-cased.
#[must_use]
pub fn column_part_of(reference: &str) -> String {
    reference
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .take_while(char::is_ascii_uppercase)
        .collect()
}

/// Digits of a reference (`"AB12"` gives `"12"`).
#[must_use]
pub fn row_part_of(reference: &str) -> String {
    reference.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    row: usize,
    column: usize,
}

impl CellAddress {
    pub fn new(row: usize, column: usize) -> Result<Self> {
        // Validates both halves.
        cell_reference(row, column)?;
        Ok(Self { row, column })
    }

    pub fn parse(reference: &str) -> Result<Self> {
        let column = column_name_to_index(&column_part_of(reference))?;
        let row_text = row_part_of(reference);
        let row = row_text.parse::<usize>().map_err(|_| {
            XlsxError::Range(format!("reference \"{reference}\" has no row number"))
        })?;
        Self::new(row, column)
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match index_to_column_name(self.column) {
            Ok(name) => write!(f, "{}{}", name, self.row),
            Err(_) => Err(fmt::Error),
        }
    }
}
