//! Typed report writer on top of `rust_xlsxwriter`.
//!
//! Every sheet starts with a header row built from its column titles. Data
//! rows are written from [`CellValue`]s, with number formats taken from
//! [`WriterOptions`].

use std::fs;
use std::path::Path;

use chrono::NaiveTime;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use tracing::debug;

use crate::address::{MAX_COLUMNS, MAX_ROWS};
use crate::error::{Result, XlsxError};
use crate::excel::{CellValue, to_ole_serial};
use crate::options::WriterOptions;

/// Largest integer magnitude a worksheet number stores exactly (2^53).
const MAX_EXACT_INTEGER: i64 = 1 << 53;

/// Header title and width of one report column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportColumn {
    pub title: String,
    pub width: f64,
}

impl ReportColumn {
    pub fn new(title: impl Into<String>, width: f64) -> Self {
        Self {
            title: title.into(),
            width,
        }
    }
}

#[derive(Clone)]
struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
    decimal: Format,
    percent: Format,
}

impl Formats {
    fn from_options(options: &WriterOptions) -> Self {
        let header = if options.bold_header {
            Format::new().set_bold()
        } else {
            Format::new()
        };
        Self {
            header,
            date: Format::new().set_num_format(&options.date_format),
            datetime: Format::new().set_num_format(&options.datetime_format),
            decimal: Format::new().set_num_format(&options.decimal_format),
            percent: Format::new().set_num_format(&options.percent_format),
        }
    }
}

pub struct ReportWriter {
    workbook: XlsxWorkbook,
    options: WriterOptions,
    formats: Formats,
    sheet_count: usize,
}

impl ReportWriter {
    pub fn new(options: WriterOptions) -> Self {
        let formats = Formats::from_options(&options);
        Self {
            workbook: XlsxWorkbook::new(),
            options,
            formats,
            sheet_count: 0,
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Start a sheet with a header row made of the column titles.
    pub fn sheet(&self, name: &str, columns: &[ReportColumn]) -> Result<SheetWriter> {
        if columns.len() > MAX_COLUMNS {
            return Err(XlsxError::Range(format!(
                "{} columns exceed the sheet limit of {MAX_COLUMNS}",
                columns.len()
            )));
        }

        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        for (col, column) in columns.iter().enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, column.width)?;
            worksheet.write_string_with_format(0, col, &column.title, &self.formats.header)?;
        }
        if self.options.freeze_header {
            worksheet.set_freeze_panes(1, 0)?;
        }

        Ok(SheetWriter {
            worksheet,
            formats: self.formats.clone(),
            width: columns.len(),
            next_row: 1,
        })
    }

    /// Append a finished sheet to the workbook.
    pub fn push_sheet(&mut self, sheet: SheetWriter) {
        debug!(rows = sheet.next_row - 1, "sheet added to report");
        self.workbook.push_worksheet(sheet.worksheet);
        self.sheet_count += 1;
    }

    /// Write the workbook to `path`, creating parent directories and
    /// replacing an existing file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        if self.sheet_count == 0 {
            self.workbook.add_worksheet();
        }
        self.workbook.save(path)?;
        debug!(path = %path.display(), sheets = self.sheet_count, "report saved");
        Ok(())
    }
}

/// Rows of one report sheet, written below the header.
pub struct SheetWriter {
    worksheet: Worksheet,
    formats: Formats,
    width: usize,
    next_row: u32,
}

impl SheetWriter {
    /// Number of data rows written so far.
    pub fn row_count(&self) -> usize {
        (self.next_row - 1) as usize
    }

    /// Write one data row. `None` leaves the cell blank.
    ///
    /// Cells are stored as doubles, so integers beyond 2^53 in magnitude are
    /// rejected with a `Range` error and nothing of the row is written.
    pub fn write_row(&mut self, values: &[Option<CellValue>]) -> Result<()> {
        if values.len() > self.width {
            return Err(XlsxError::Argument(format!(
                "row has {} values but the sheet has {} columns",
                values.len(),
                self.width
            )));
        }
        if let Some(i) = values.iter().flatten().find_map(|value| match value {
            CellValue::Integer(i) if i.unsigned_abs() > MAX_EXACT_INTEGER as u64 => Some(*i),
            _ => None,
        }) {
            return Err(XlsxError::Range(format!(
                "integer {i} cannot be stored exactly (limit is +/-{MAX_EXACT_INTEGER})"
            )));
        }
        if self.next_row as usize >= MAX_ROWS {
            return Err(XlsxError::Range(format!(
                "row index {} is out of range (1...{MAX_ROWS})",
                self.next_row + 1
            )));
        }

        let row = self.next_row;
        for (col, value) in values.iter().enumerate() {
            if let Some(value) = value {
                self.write_value(row, col as u16, value)?;
            }
        }
        self.next_row += 1;
        Ok(())
    }

    fn write_value(&mut self, row: u32, col: u16, value: &CellValue) -> Result<()> {
        let ws = &mut self.worksheet;
        match value {
            CellValue::String(s) => {
                ws.write_string(row, col, s)?;
            }
            CellValue::Integer(i) => {
                ws.write_number(row, col, *i as f64)?;
            }
            CellValue::Decimal(d) => {
                ws.write_number_with_format(row, col, *d, &self.formats.decimal)?;
            }
            CellValue::Percent(p) => {
                ws.write_number_with_format(row, col, *p, &self.formats.percent)?;
            }
            CellValue::Date(date) => {
                let serial = to_ole_serial(date.and_time(NaiveTime::MIN));
                ws.write_number_with_format(row, col, serial, &self.formats.date)?;
            }
            CellValue::DateTime(dt) => {
                ws.write_number_with_format(row, col, to_ole_serial(*dt), &self.formats.datetime)?;
            }
            CellValue::Boolean(b) => {
                ws.write_boolean(row, col, *b)?;
            }
        }
        Ok(())
    }
}
