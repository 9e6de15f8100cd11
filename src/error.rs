use std::fmt;

use thiserror::Error;

/// Errors raised while reading or writing workbooks.
#[derive(Debug, Error)]
pub enum XlsxError {
    /// Row/column index or reference outside the sheet limits.
    #[error("{0}")]
    Range(String),

    /// Worksheet selector did not match any sheet.
    #[error("worksheet {selector} was not found in \"{file}\"")]
    NotFound { selector: String, file: String },

    /// Cell text could not be parsed as the requested type.
    #[error("cell value \"{value}\" at {reference} is not {expected} in \"{file}\"")]
    Format {
        value: String,
        reference: String,
        expected: &'static str,
        file: String,
    },

    #[error(transparent)]
    Binding(#[from] BindingFailure),

    /// Invalid argument passed by the caller (zero counts and similar).
    #[error("{0}")]
    Argument(String),

    /// The zip container does not look like a spreadsheet package.
    #[error("invalid workbook package \"{file}\": {reason}")]
    InvalidPackage { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Writer(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, XlsxError>;

/// Aggregate result of a header pass that left definitions unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingFailure {
    file: String,
    missing: Vec<String>,
}

impl BindingFailure {
    pub fn new(file: impl Into<String>, missing: Vec<String>) -> Self {
        Self {
            file: file.into(),
            missing,
        }
    }

    /// Captions that could not be matched, in definition order.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Missing captions as one caption per line.
    pub fn missing_lines(&self) -> String {
        let mut out = String::new();
        for caption in &self.missing {
            out.push_str(caption);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for BindingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "required columns are missing in \"{}\"\nexpected columns:",
            self.file
        )?;
        for caption in &self.missing {
            write!(f, "\n{caption}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BindingFailure {}
