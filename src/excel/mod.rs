mod cursor;
mod package;
mod value;
mod xml;

pub use cursor::WorksheetCursor;
pub use package::{Workbook, WorksheetSelector};
pub use value::{
    CellKind, CellValue, from_ole_serial, parse_decimal, parse_integer, parse_iso_datetime,
    to_ole_serial,
};
