//! Forward-only worksheet cursor.
//!
//! Worksheet XML only stores cells that have content, and rows that contain
//! at least one such cell. The cursor hides that: rows skipped in storage are
//! surfaced as *virtual* rows whose cells all read as `None`, and the same
//! goes for cells skipped inside a physical row. Every typed read consumes
//! exactly one column position.

use std::io::BufReader;

use chrono::NaiveDateTime;
use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use tracing::debug;
use zip::read::ZipFile;

use crate::address::{CellAddress, MAX_ROWS, cell_reference, column_name_to_index, column_part_of};
use crate::error::{Result, XlsxError};
use crate::excel::value::{
    CellKind, CellValue, from_ole_serial, parse_decimal, parse_integer, parse_iso_datetime,
};
use crate::excel::xml::{attr_value, push_text};
use crate::options::{NumberFormat, ReaderOptions};

/// Days between the 1900 (OLE) and 1904 date epochs.
const EPOCH_1904_OFFSET: f64 = 1462.0;

/// How a cell stores its payload (`t` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Number,
    Shared,
    Inline,
    FormulaString,
    Boolean,
    Error,
    IsoDate,
}

impl Storage {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => Storage::Shared,
            Some("inlineStr") => Storage::Inline,
            Some("str") => Storage::FormulaString,
            Some("b") => Storage::Boolean,
            Some("e") => Storage::Error,
            Some("d") => Storage::IsoDate,
            _ => Storage::Number,
        }
    }

    fn is_text(self) -> bool {
        matches!(
            self,
            Storage::Shared | Storage::Inline | Storage::FormulaString | Storage::Error
        )
    }
}

/// A physical `<c>` element read from the stream.
#[derive(Debug, Clone)]
struct RawCell {
    column: usize,
    storage: Storage,
    value: Option<String>,
    inline: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct RowStart {
    number: usize,
    is_empty_element: bool,
}

pub struct WorksheetCursor<'a> {
    reader: XmlReader<BufReader<ZipFile<'a>>>,
    buf: Vec<u8>,
    shared_strings: &'a [String],
    file_name: &'a str,
    sheet_name: String,
    is_1904: bool,

    column_count: usize,
    row_count: usize,

    row_number: usize,
    row_ordinal: usize,
    cell_number: usize,
    cell_ordinal: usize,
    pending_cell: Option<RawCell>,

    /// Row start already read from the stream but not surfaced yet; virtual
    /// rows are emitted until the ordinal catches up with it.
    pending_row: Option<RowStart>,
    /// The stream is positioned inside the surfaced physical row.
    row_open: bool,
    last_physical_row: usize,
    last_physical_column: usize,
    exhausted: bool,
}

impl<'a> WorksheetCursor<'a> {
    pub(crate) fn open(
        entry: ZipFile<'a>,
        shared_strings: &'a [String],
        file_name: &'a str,
        sheet_name: String,
        is_1904: bool,
    ) -> Result<Self> {
        let mut cursor = Self {
            reader: XmlReader::from_reader(BufReader::new(entry)),
            buf: Vec::with_capacity(1024),
            shared_strings,
            file_name,
            sheet_name,
            is_1904,
            column_count: 0,
            row_count: 0,
            row_number: 0,
            row_ordinal: 0,
            cell_number: 0,
            cell_ordinal: 0,
            pending_cell: None,
            pending_row: None,
            row_open: false,
            last_physical_row: 0,
            last_physical_column: 0,
            exhausted: false,
        };
        cursor.read_dimensions()?;
        debug!(
            sheet = %cursor.sheet_name,
            columns = cursor.column_count,
            rows = cursor.row_count,
            "worksheet dimensions"
        );
        Ok(cursor)
    }

    pub fn file_name(&self) -> &str {
        self.file_name
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Last column of the declared sheet range, 0 when the sheet has none.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Last row of the declared sheet range, 0 when the sheet has none.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Row number of the current row (declared number for physical rows).
    pub fn current_row(&self) -> usize {
        self.row_number
    }

    /// Number of successful row advances so far.
    pub fn current_row_ordinal(&self) -> usize {
        self.row_ordinal
    }

    /// 1-based column position the next read will consume.
    pub fn current_column(&self) -> usize {
        self.cell_ordinal
    }

    /// True once the end of the sheet data has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending_row.is_none()
    }

    /// Advance to the next row.
    ///
    /// Returns `false` at the end of the sheet. A physical row without cells
    /// returns `allow_empty_row`; the cursor still moves past it.
    pub fn move_to_next_row(&mut self, allow_empty_row: bool) -> Result<bool> {
        if self.pending_row.is_none() {
            match self.next_row_start()? {
                Some(row) => self.pending_row = Some(row),
                None => {
                    self.exhausted = true;
                    self.reset_cells();
                    self.row_open = false;
                    return Ok(false);
                }
            }
        }

        self.row_ordinal += 1;
        self.reset_cells();
        self.row_open = false;

        let Some(row) = self.pending_row else {
            return Ok(false);
        };
        if row.number > self.row_ordinal {
            self.row_number = self.row_ordinal;
            return Ok(true);
        }

        self.pending_row = None;
        self.row_number = row.number;
        self.row_open = !row.is_empty_element;
        self.last_physical_column = 0;

        match self.next_physical_cell()? {
            Some(cell) => {
                self.cell_number = cell.column;
                self.pending_cell = Some(cell);
                Ok(true)
            }
            None => Ok(allow_empty_row),
        }
    }

    /// Advance `count` rows, accepting empty rows. Stops at the first row
    /// that cannot be reached.
    pub fn move_to_next_rows(&mut self, count: usize) -> Result<bool> {
        if count == 0 {
            return Err(XlsxError::Argument(
                "row count cannot be zero".to_string(),
            ));
        }
        for _ in 0..count {
            if !self.move_to_next_row(true)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Move the cell position forward by `count` columns. Returns `false` when
    /// the row runs out of physical cells first.
    pub fn skip_cells(&mut self, count: usize) -> Result<bool> {
        if count == 0 {
            return Err(XlsxError::Argument(
                "cell count cannot be zero".to_string(),
            ));
        }
        for _ in 0..count {
            if self.cell_ordinal < self.cell_number {
                self.cell_ordinal += 1;
                continue;
            }
            match self.next_physical_cell()? {
                Some(cell) => {
                    self.cell_number = cell.column;
                    self.pending_cell = Some(cell);
                    self.cell_ordinal += 1;
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Text of the current cell: shared string, inline string or raw value.
    pub fn read_cell_as_string(&mut self) -> Result<Option<String>> {
        let cell = self.take_current_cell();
        let result = match &cell {
            Some(cell) => self.cell_text(cell),
            None => Ok(None),
        };
        self.advance_after_read()?;
        result
    }

    pub fn read_cell_as_integer(&mut self) -> Result<Option<i64>> {
        let cell = self.take_current_cell();
        let result = self.cell_integer(cell.as_ref());
        self.advance_after_read()?;
        result
    }

    /// Fractional number. Text cells follow `format`; numbers stored in the
    /// sheet are always written with a dot.
    pub fn read_cell_as_decimal(&mut self, format: NumberFormat) -> Result<Option<f64>> {
        let cell = self.take_current_cell();
        let result = self.cell_decimal(cell.as_ref(), format);
        self.advance_after_read()?;
        result
    }

    /// Date from an OLE Automation serial or an ISO `t="d"` cell. With
    /// `allow_non_date` values that are not dates read as `None`.
    pub fn read_cell_as_date(&mut self, allow_non_date: bool) -> Result<Option<NaiveDateTime>> {
        let cell = self.take_current_cell();
        let result = self.cell_date(cell.as_ref(), allow_non_date);
        self.advance_after_read()?;
        result
    }

    pub fn read_cell_as_boolean(&mut self) -> Result<Option<bool>> {
        let cell = self.take_current_cell();
        let result = self.cell_boolean(cell.as_ref());
        self.advance_after_read()?;
        result
    }

    /// Read the current cell as `kind`.
    pub fn read_cell_as(
        &mut self,
        kind: CellKind,
        options: &ReaderOptions,
    ) -> Result<Option<CellValue>> {
        let value = match kind {
            CellKind::String => self.read_cell_as_string()?.map(CellValue::String),
            CellKind::Integer => self.read_cell_as_integer()?.map(CellValue::Integer),
            CellKind::Decimal => self
                .read_cell_as_decimal(options.number_format)?
                .map(CellValue::Decimal),
            CellKind::Percent => self
                .read_cell_as_decimal(options.number_format)?
                .map(CellValue::Percent),
            CellKind::Date => self
                .read_cell_as_date(options.allow_non_date)?
                .map(|dt| CellValue::Date(dt.date())),
            CellKind::DateTime => self.read_cell_as_date(false)?.map(CellValue::DateTime),
            CellKind::Boolean => self.read_cell_as_boolean()?.map(CellValue::Boolean),
        };
        Ok(value)
    }

    fn reset_cells(&mut self) {
        self.pending_cell = None;
        self.cell_number = 0;
        self.cell_ordinal = 1;
    }

    fn take_current_cell(&mut self) -> Option<RawCell> {
        if self.cell_number != 0 && self.cell_number == self.cell_ordinal {
            self.pending_cell.take()
        } else {
            None
        }
    }

    fn advance_after_read(&mut self) -> Result<()> {
        if !self.skip_cells(1)? {
            self.pending_cell = None;
            self.cell_number = 0;
        }
        Ok(())
    }

    fn current_reference(&self) -> String {
        cell_reference(self.row_number.max(1), self.cell_ordinal.max(1))
            .unwrap_or_else(|_| format!("R{}C{}", self.row_number, self.cell_ordinal))
    }

    fn format_error(&self, value: &str, expected: &'static str) -> XlsxError {
        XlsxError::Format {
            value: value.to_string(),
            reference: self.current_reference(),
            expected,
            file: self.file_name.to_string(),
        }
    }

    fn cell_text(&self, cell: &RawCell) -> Result<Option<String>> {
        match cell.storage {
            Storage::Shared => {
                let Some(raw) = cell.value.as_deref() else {
                    return Ok(None);
                };
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.shared_strings.get(idx))
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| self.format_error(raw, "a shared string index"))
            }
            Storage::Inline => Ok(cell.inline.clone().or_else(|| cell.value.clone())),
            _ => Ok(cell.value.clone()),
        }
    }

    /// Non-blank text of the cell, `None` for absent or blank payloads.
    fn cell_payload(&self, cell: Option<&RawCell>) -> Result<Option<String>> {
        let Some(cell) = cell else {
            return Ok(None);
        };
        Ok(self.cell_text(cell)?.filter(|s| !s.trim().is_empty()))
    }

    fn cell_integer(&self, cell: Option<&RawCell>) -> Result<Option<i64>> {
        let Some(text) = self.cell_payload(cell)? else {
            return Ok(None);
        };
        parse_integer(&text)
            .map(Some)
            .ok_or_else(|| self.format_error(&text, "an integral number"))
    }

    fn cell_decimal(&self, cell: Option<&RawCell>, format: NumberFormat) -> Result<Option<f64>> {
        let Some(text) = self.cell_payload(cell)? else {
            return Ok(None);
        };
        let stored_number = cell.is_some_and(|c| c.storage == Storage::Number);
        let format = if stored_number {
            NumberFormat::default()
        } else {
            format
        };
        parse_decimal(&text, format)
            .map(Some)
            .ok_or_else(|| self.format_error(&text, "a fractional number"))
    }

    fn cell_date(&self, cell: Option<&RawCell>, allow_non_date: bool) -> Result<Option<NaiveDateTime>> {
        let Some(text) = self.cell_payload(cell)? else {
            return Ok(None);
        };
        let storage = cell.map_or(Storage::Number, |c| c.storage);
        let parsed = match storage {
            Storage::IsoDate => parse_iso_datetime(&text),
            s if s.is_text() => parse_iso_datetime(&text),
            _ => parse_decimal(&text, NumberFormat::default())
                .map(|serial| {
                    if self.is_1904 {
                        serial + EPOCH_1904_OFFSET
                    } else {
                        serial
                    }
                })
                .and_then(from_ole_serial),
        };
        match parsed {
            Some(dt) => Ok(Some(dt)),
            None if allow_non_date => Ok(None),
            None => Err(self.format_error(&text, "a date")),
        }
    }

    fn cell_boolean(&self, cell: Option<&RawCell>) -> Result<Option<bool>> {
        let Some(text) = self.cell_payload(cell)? else {
            return Ok(None);
        };
        match text.trim().to_lowercase().as_str() {
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            _ => Err(self.format_error(&text, "a boolean")),
        }
    }

    /// Read `<dimension ref>` if it precedes `<sheetData>`.
    fn read_dimensions(&mut self) -> Result<()> {
        loop {
            self.buf.clear();
            let dimension = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(tag) | Event::Empty(tag)
                    if tag.local_name().as_ref() == b"dimension" =>
                {
                    attr_value(&tag, b"ref")?
                }
                Event::Start(tag) if tag.local_name().as_ref() == b"sheetData" => return Ok(()),
                Event::Empty(tag) if tag.local_name().as_ref() == b"sheetData" => {
                    self.exhausted = true;
                    return Ok(());
                }
                Event::Eof => {
                    self.exhausted = true;
                    return Ok(());
                }
                _ => continue,
            };

            if let Some(range) = dimension {
                // "A1:C5" declares C5 as the last cell, a lone "A1" is the
                // only cell.
                let last = range.rsplit(':').next().unwrap_or_default();
                let address = CellAddress::parse(last)?;
                self.column_count = address.column();
                self.row_count = address.row();
            }
            return Ok(());
        }
    }

    fn next_row_start(&mut self) -> Result<Option<RowStart>> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let (reference, is_empty_element) = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(tag) if tag.local_name().as_ref() == b"row" => {
                    (attr_value(&tag, b"r")?, false)
                }
                Event::Empty(tag) if tag.local_name().as_ref() == b"row" => {
                    (attr_value(&tag, b"r")?, true)
                }
                Event::End(tag) if tag.local_name().as_ref() == b"sheetData" => return Ok(None),
                Event::Eof => return Ok(None),
                _ => continue,
            };

            let number = match reference {
                Some(text) => {
                    let parsed = text.trim().parse::<usize>().map_err(|_| {
                        XlsxError::Range(format!(
                            "row number \"{text}\" is not valid in \"{}\"",
                            self.file_name
                        ))
                    })?;
                    if parsed == 0 {
                        // Some generators number the first row 0.
                        debug!(sheet = %self.sheet_name, "row number 0 treated as row 1");
                        1
                    } else {
                        parsed
                    }
                }
                None => self.last_physical_row + 1,
            };
            if number > MAX_ROWS {
                return Err(XlsxError::Range(format!(
                    "row index {number} is out of range (1...{MAX_ROWS})"
                )));
            }
            self.last_physical_row = number;
            return Ok(Some(RowStart {
                number,
                is_empty_element,
            }));
        }
    }

    fn next_physical_cell(&mut self) -> Result<Option<RawCell>> {
        if !self.row_open {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let (reference, cell_type, has_body) = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(tag) if tag.local_name().as_ref() == b"c" => {
                    (attr_value(&tag, b"r")?, attr_value(&tag, b"t")?, true)
                }
                Event::Empty(tag) if tag.local_name().as_ref() == b"c" => {
                    (attr_value(&tag, b"r")?, attr_value(&tag, b"t")?, false)
                }
                Event::End(tag) if tag.local_name().as_ref() == b"row" => {
                    self.row_open = false;
                    return Ok(None);
                }
                Event::Eof => {
                    self.row_open = false;
                    self.exhausted = true;
                    return Ok(None);
                }
                _ => continue,
            };

            let column = match reference {
                Some(r) => column_name_to_index(&column_part_of(&r))?,
                None => self.last_physical_column + 1,
            };
            self.last_physical_column = column;

            let mut cell = RawCell {
                column,
                storage: Storage::from_attr(cell_type.as_deref()),
                value: None,
                inline: None,
            };
            if has_body {
                self.read_cell_body(&mut cell)?;
            }
            return Ok(Some(cell));
        }
    }

    /// Consume a `<c>` body up to `</c>`, collecting `<v>` and inline text.
    fn read_cell_body(&mut self, cell: &mut RawCell) -> Result<()> {
        let mut in_value = false;
        let mut in_inline = false;
        let mut in_text = false;
        let mut phonetic_depth = 0usize;
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;
            match &event {
                Event::Start(tag) => match tag.local_name().as_ref() {
                    b"v" => {
                        in_value = true;
                        cell.value.get_or_insert_with(String::new);
                    }
                    b"is" => {
                        in_inline = true;
                        cell.inline.get_or_insert_with(String::new);
                    }
                    b"rPh" => phonetic_depth += 1,
                    b"t" => in_text = in_inline && phonetic_depth == 0,
                    _ => {}
                },
                Event::End(tag) => match tag.local_name().as_ref() {
                    b"c" => return Ok(()),
                    b"v" => in_value = false,
                    b"is" => in_inline = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_text = false,
                    _ => {}
                },
                Event::Eof => {
                    return Err(XlsxError::InvalidPackage {
                        file: self.file_name.to_string(),
                        reason: format!(
                            "worksheet \"{}\" ends inside a cell",
                            self.sheet_name
                        ),
                    });
                }
                other => {
                    if in_value && let Some(value) = cell.value.as_mut() {
                        push_text(other, value)?;
                    } else if in_text && let Some(inline) = cell.inline.as_mut() {
                        push_text(other, inline)?;
                    }
                }
            }
        }
    }
}
