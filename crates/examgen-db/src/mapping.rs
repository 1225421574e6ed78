//! Row mapping: commands carrying named parameters, result rows read by
//! column name, and the [`RowMapper`] capability tying them to an entity.
//!
//! Every query aliases its columns with the entity prefix (`subject_id`,
//! `topic_name`, `question_used`, ...). A mapper reads the same names whether
//! the row comes from a single-table select or from a joined tree query.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use examgen_core::entities::Entity;
use examgen_core::enums::GradeLevel;

use crate::error::MappingError;
use crate::helpers::{parse_datetime, value_kind};

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Named parameters for one statement. Names are given without the `:`
/// prefix used in the SQL text.
#[derive(Debug, Default, Clone)]
pub struct Command {
    params: Vec<(String, libsql::Value)>,
}

impl Command {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `:name`, replacing an earlier binding of the same name.
    pub fn bind(&mut self, name: &str, value: impl ToColumn) -> &mut Self {
        let key = format!(":{name}");
        let value = value.to_column();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
        self
    }

    /// Owned variant of [`Self::bind`] for building commands inline.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl ToColumn) -> Self {
        self.bind(name, value);
        self
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        let key = format!(":{name}");
        self.params.iter().any(|(k, _)| *k == key)
    }

    pub(crate) fn into_params(self) -> libsql::params::Params {
        if self.params.is_empty() {
            libsql::params::Params::None
        } else {
            libsql::params::Params::Named(self.params)
        }
    }
}

/// Conversion of a Rust value into a bound SQL value.
pub trait ToColumn {
    fn to_column(self) -> libsql::Value;
}

impl ToColumn for i64 {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Integer(self)
    }
}

impl ToColumn for u32 {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Integer(i64::from(self))
    }
}

impl ToColumn for bool {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Integer(i64::from(self))
    }
}

impl ToColumn for char {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Text(self.to_string())
    }
}

impl ToColumn for &str {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Text(self.to_string())
    }
}

impl ToColumn for String {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Text(self)
    }
}

impl ToColumn for DateTime<Utc> {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Text(self.to_rfc3339())
    }
}

impl ToColumn for GradeLevel {
    fn to_column(self) -> libsql::Value {
        libsql::Value::Integer(self.as_i64())
    }
}

impl<T: ToColumn> ToColumn for Option<T> {
    fn to_column(self) -> libsql::Value {
        self.map_or(libsql::Value::Null, ToColumn::to_column)
    }
}

// ---------------------------------------------------------------------------
// Result rows
// ---------------------------------------------------------------------------

/// Column name → position lookup, built once per result set.
#[derive(Debug, Default)]
pub(crate) struct ColumnIndex {
    positions: HashMap<String, i32>,
}

impl ColumnIndex {
    pub(crate) fn from_rows(rows: &libsql::Rows) -> Self {
        let positions = (0..rows.column_count())
            .filter_map(|idx| rows.column_name(idx).map(|name| (name.to_string(), idx)))
            .collect();
        Self { positions }
    }
}

/// One row of a query result, read by column name.
pub struct ResultRow<'a> {
    row: &'a libsql::Row,
    columns: &'a ColumnIndex,
}

impl<'a> ResultRow<'a> {
    pub(crate) const fn new(row: &'a libsql::Row, columns: &'a ColumnIndex) -> Self {
        Self { row, columns }
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.positions.contains_key(name)
    }

    fn value(&self, name: &str) -> Result<libsql::Value, MappingError> {
        let idx = *self
            .columns
            .positions
            .get(name)
            .ok_or_else(|| MappingError::MissingColumn(name.to_string()))?;
        self.row
            .get_value(idx)
            .map_err(|e| MappingError::Unreadable {
                column: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Read a NOT NULL column.
    ///
    /// # Errors
    ///
    /// `MissingColumn` if the query did not select `name`, `UnexpectedNull`
    /// for SQL NULL, or the conversion error of `T`.
    pub fn get<T: FromColumn>(&self, name: &str) -> Result<T, MappingError> {
        match self.value(name)? {
            libsql::Value::Null => Err(MappingError::UnexpectedNull(name.to_string())),
            value => T::from_column(name, value),
        }
    }

    /// Read a nullable column.
    ///
    /// # Errors
    ///
    /// `MissingColumn` if the query did not select `name`, or the conversion
    /// error of `T`.
    pub fn get_opt<T: FromColumn>(&self, name: &str) -> Result<Option<T>, MappingError> {
        match self.value(name)? {
            libsql::Value::Null => Ok(None),
            value => T::from_column(name, value).map(Some),
        }
    }
}

/// Conversion of a non-NULL SQL value into a Rust value.
pub trait FromColumn: Sized {
    /// # Errors
    ///
    /// `TypeMismatch` when the storage class is wrong, `InvalidValue` when it
    /// is right but the content is not acceptable.
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError>;
}

fn mismatch(column: &str, expected: &'static str, found: &libsql::Value) -> MappingError {
    MappingError::TypeMismatch {
        column: column.to_string(),
        expected,
        found: value_kind(found),
    }
}

fn invalid(column: &str, reason: impl Into<String>) -> MappingError {
    MappingError::InvalidValue {
        column: column.to_string(),
        reason: reason.into(),
    }
}

impl FromColumn for i64 {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        match value {
            libsql::Value::Integer(v) => Ok(v),
            other => Err(mismatch(column, "INTEGER", &other)),
        }
    }
}

impl FromColumn for u32 {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        let raw = i64::from_column(column, value)?;
        Self::try_from(raw).map_err(|_| invalid(column, format!("{raw} is out of range")))
    }
}

impl FromColumn for bool {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        match i64::from_column(column, value)? {
            0 => Ok(false),
            1 => Ok(true),
            raw => Err(invalid(column, format!("{raw} is not a boolean flag"))),
        }
    }
}

impl FromColumn for String {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        match value {
            libsql::Value::Text(s) => Ok(s),
            other => Err(mismatch(column, "TEXT", &other)),
        }
    }
}

impl FromColumn for char {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        let text = String::from_column(column, value)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(invalid(column, format!("'{text}' is not a single character"))),
        }
    }
}

impl FromColumn for DateTime<Utc> {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        let text = String::from_column(column, value)?;
        parse_datetime(column, &text)
    }
}

impl FromColumn for GradeLevel {
    fn from_column(column: &str, value: libsql::Value) -> Result<Self, MappingError> {
        let raw = i64::from_column(column, value)?;
        Self::try_from(raw).map_err(|e| invalid(column, e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// RowMapper
// ---------------------------------------------------------------------------

/// Binds an entity's fields to a command and builds an entity from a row.
///
/// One implementation per entity type. The repository owns the identity
/// column: mappers never bind `:id`, the repository adds it for update,
/// delete, and lookups.
pub trait RowMapper: Send + Sync {
    type Entity: Entity;

    /// Aliased id column, e.g. `"topic_id"`. NULL in a joined row means the
    /// entity is absent (outer join without a match).
    const ID_COLUMN: &'static str;

    /// Bind every persisted non-identity field of `entity`.
    fn configure_parameters(&self, command: &mut Command, entity: &Self::Entity);

    /// Build a fully-populated entity from one row.
    ///
    /// # Errors
    ///
    /// Any missing column or failed coercion.
    fn map_row(&self, row: &ResultRow<'_>) -> Result<Self::Entity, MappingError>;

    /// Like [`Self::map_row`], but `None` when the id column is NULL.
    ///
    /// # Errors
    ///
    /// Same as [`Self::map_row`].
    fn map_optional(&self, row: &ResultRow<'_>) -> Result<Option<Self::Entity>, MappingError> {
        if row.get_opt::<i64>(Self::ID_COLUMN)?.is_none() {
            return Ok(None);
        }
        self.map_row(row).map(Some)
    }
}
