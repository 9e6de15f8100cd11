use serde_json::{Value, json};

use crate::excel::CellValue;

/// JSON form of a bound cell. Dates become ISO strings, absent cells `null`.
pub fn cell_value_to_json(value: Option<&CellValue>) -> Value {
    let Some(value) = value else {
        return Value::Null;
    };
    match value {
        CellValue::String(s) => json!(s),
        CellValue::Integer(i) => json!(i),
        CellValue::Decimal(d) | CellValue::Percent(d) => json!(d),
        CellValue::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
        CellValue::DateTime(dt) => json!(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        CellValue::Boolean(b) => json!(b),
    }
}
