mod converters;
mod exporters;
mod types;

pub use converters::cell_value_to_json;
pub use exporters::{export_rows, serialize_to_json, write_json_to_file};
pub use types::{OrderedRows, WorkbookExport};
