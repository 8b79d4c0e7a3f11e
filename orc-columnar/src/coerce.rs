//! Soft conversion of decoded text into a requested shape.

use crate::column::{Decimal, Shape, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Convert a string cell to `shape`. Text that does not parse becomes `None`.
pub fn coerce_text(text: String, shape: &Shape) -> Option<Value> {
    match shape {
        Shape::Native => Some(Value::String(text)),
        Shape::Decimal => text.trim().parse::<Decimal>().ok().map(Value::Decimal),
        Shape::Timestamp => parse_timestamp(text.trim()).map(Value::Timestamp),
        Shape::Record(_) => None,
    }
}

/// RFC 3339 (normalized to UTC), `YYYY-MM-DD HH:MM:SS[.f]`, or a bare date at midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::default()))
}
