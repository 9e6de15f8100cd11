use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Deserialize;
use std::fmt;

use crate::options::NumberFormat;

/// Declared type of a bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    #[default]
    String,
    Integer,
    Decimal,
    Percent,
    Date,
    DateTime,
    Boolean,
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Decimal(f64),
    /// Stored as a fraction, `0.25` for 25%.
    Percent(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Boolean(bool),
}

impl CellValue {
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::String(_) => CellKind::String,
            CellValue::Integer(_) => CellKind::Integer,
            CellValue::Decimal(_) => CellKind::Decimal,
            CellValue::Percent(_) => CellKind::Percent,
            CellValue::Date(_) => CellKind::Date,
            CellValue::DateTime(_) => CellKind::DateTime,
            CellValue::Boolean(_) => CellKind::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Decimal(d) | CellValue::Percent(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Decimal(d) => write!(f, "{d}"),
            CellValue::Percent(p) => write!(f, "{}%", p * 100.0),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Parse integral cell text: optional sign, digits, surrounding whitespace.
pub fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Parse fractional cell text with the given separator rules.
///
/// Group separators are not accepted, so with a comma separator `"1.234,5"`
/// fails unless `convert` is set (and then still fails on the second
/// separator).
pub fn parse_decimal(text: &str, format: NumberFormat) -> Option<f64> {
    let mut s = text.trim().to_string();
    if format.convert {
        s = s.replace(format.separator.other(), &format.separator.as_char().to_string());
    }

    let separator = format.separator.as_char();
    if s.contains(format.separator.other()) {
        return None;
    }

    let body = s.strip_prefix(['+', '-']).unwrap_or(&s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let mut parts = mantissa.split(separator);
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.is_none_or(all_digits) {
        return None;
    }
    if int_part.is_empty() && frac_part.is_none_or(str::is_empty) {
        return None;
    }
    if let Some(exp) = exponent {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp_digits.is_empty() || !all_digits(exp_digits) {
            return None;
        }
    }

    let canonical = if separator == '.' {
        s
    } else {
        s.replace(separator, ".")
    };
    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

const MILLIS_PER_DAY: i64 = 86_400_000;

fn ole_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// Convert an OLE Automation date serial (days since 1899-12-30) to a
/// date-time. Negative serials keep a positive time-of-day fraction.
pub fn from_ole_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= -657_435.0 || serial >= 2_958_466.0 {
        return None;
    }

    let rounding = if serial >= 0.0 { 0.5 } else { -0.5 };
    let mut millis = (serial * MILLIS_PER_DAY as f64 + rounding) as i64;
    if millis < 0 {
        millis -= (millis % MILLIS_PER_DAY) * 2;
    }

    ole_epoch().checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Inverse of [`from_ole_serial`].
pub fn to_ole_serial(value: NaiveDateTime) -> f64 {
    let millis = (value - ole_epoch()).num_milliseconds();
    if millis >= 0 {
        return millis as f64 / MILLIS_PER_DAY as f64;
    }

    // Whole days go negative, the time of day stays positive.
    let days = millis.div_euclid(MILLIS_PER_DAY);
    let time_of_day = millis.rem_euclid(MILLIS_PER_DAY);
    days as f64 - time_of_day as f64 / MILLIS_PER_DAY as f64
}

/// Parse the ISO-8601 payload of a `t="d"` cell.
pub fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
