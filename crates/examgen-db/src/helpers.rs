//! Column value conversion helpers.
//!
//! Timestamps are written with `to_rfc3339()`, but rows touched by hand or
//! by `SQLite`'s `datetime('now')` use `"YYYY-MM-DD HH:MM:SS"`; both parse.

use chrono::{DateTime, Utc};

use crate::error::MappingError;

/// Parse a TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `MappingError::InvalidValue` if the string matches neither format.
pub fn parse_datetime(column: &str, s: &str) -> Result<DateTime<Utc>, MappingError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| MappingError::InvalidValue {
            column: column.to_string(),
            reason: format!("failed to parse datetime '{s}': {e}"),
        })
}

/// Name of the storage class held by a libSQL value, for error messages.
#[must_use]
pub const fn value_kind(value: &libsql::Value) -> &'static str {
    match value {
        libsql::Value::Null => "NULL",
        libsql::Value::Integer(_) => "INTEGER",
        libsql::Value::Real(_) => "REAL",
        libsql::Value::Text(_) => "TEXT",
        libsql::Value::Blob(_) => "BLOB",
    }
}
