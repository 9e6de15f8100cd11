use serde::Deserialize;
use std::str::FromStr;

/// Decimal separator expected in numeric cell text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Dot,
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    /// The separator this one is converted from when rewriting is enabled.
    pub fn other(self) -> char {
        match self {
            DecimalSeparator::Dot => ',',
            DecimalSeparator::Comma => '.',
        }
    }
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" | "." => Ok(DecimalSeparator::Dot),
            "comma" | "," => Ok(DecimalSeparator::Comma),
            _ => Err(format!("unknown decimal separator: {s}")),
        }
    }
}

/// How decimal cell text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    pub separator: DecimalSeparator,
    /// Rewrite the other separator to `separator` before parsing.
    pub convert: bool,
}

impl NumberFormat {
    pub fn new(separator: DecimalSeparator, convert: bool) -> Self {
        Self { separator, convert }
    }
}

/// Options used by row extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub number_format: NumberFormat,
    /// Date columns yield no value instead of failing on non-date text.
    /// Date-and-time columns are always strict.
    pub allow_non_date: bool,
}

/// Number formats and layout switches for the report writer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    pub date_format: String,
    pub datetime_format: String,
    pub decimal_format: String,
    pub percent_format: String,
    pub bold_header: bool,
    pub freeze_header: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            date_format: "dd.mm.yyyy".to_string(),
            datetime_format: "dd.mm.yyyy hh:mm:ss".to_string(),
            decimal_format: "#,##0.00".to_string(),
            percent_format: "0.00%".to_string(),
            bold_header: true,
            freeze_header: true,
        }
    }
}
