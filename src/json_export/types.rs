use indexmap::IndexMap;
use serde_json::Value;

/// Rows of one sheet, each keyed by column caption in layout order.
pub type OrderedRows = Vec<IndexMap<String, Value>>;

/// Exported sheets keyed by sheet name.
pub type WorkbookExport = IndexMap<String, OrderedRows>;
