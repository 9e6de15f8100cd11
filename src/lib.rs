//! Forward-only reading of xlsx worksheets with typed cell access and
//! caption-based column binding.
//!
//! ```no_run
//! use xlsx_cursor::{CellKind, ColumnDefinition, ReaderOptions, Workbook, bind_columns, read_columns};
//!
//! # fn main() -> xlsx_cursor::Result<()> {
//! let mut workbook = Workbook::open("report.xlsx")?;
//! let mut cursor = workbook.open_worksheet(1usize)?;
//! let mut columns = vec![
//!     ColumnDefinition::new("Name", CellKind::String),
//!     ColumnDefinition::new("Amount", CellKind::Decimal),
//! ];
//! cursor.move_to_next_row(false)?;
//! bind_columns(&mut cursor, &mut columns, None)?;
//! while cursor.move_to_next_row(false)? {
//!     read_columns(&mut cursor, &mut columns, &ReaderOptions::default(), None)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod binding;
pub mod error;
pub mod excel;
pub mod json_export;
pub mod options;
pub mod writer;

pub use address::{CellAddress, cell_reference, column_name_to_index, index_to_column_name};
pub use binding::{
    ColumnDefinition, bind_columns, bind_columns_multi_row, header_definitions, read_columns,
};
pub use error::{BindingFailure, Result, XlsxError};
pub use excel::{CellKind, CellValue, Workbook, WorksheetCursor, WorksheetSelector};
pub use options::{DecimalSeparator, NumberFormat, ReaderOptions, WriterOptions};
pub use writer::{ReportColumn, ReportWriter, SheetWriter};
