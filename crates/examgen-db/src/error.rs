//! Database error types for examgen-db.
//!
//! Store-specific errors never leave this crate: every `libsql::Error` is
//! translated into [`DatabaseError::Persistence`] at the `?` boundary.

use examgen_core::CoreError;
use thiserror::Error;

/// Errors from repository and assembly operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A result row could not be turned into an entity.
    #[error("Mapping failed: {0}")]
    Mapping(#[from] MappingError),

    /// The store rejected or failed a statement (constraints, locks,
    /// connection problems).
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Not enough unused questions to satisfy a generation request.
    #[error("Insufficient questions: requested {requested}, only {available} unused")]
    InsufficientQuestions { requested: usize, available: usize },

    /// An entity broke an invariant before reaching the store.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<libsql::Error> for DatabaseError {
    fn from(e: libsql::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<CoreError> for DatabaseError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Other(err) => Self::Other(err),
        }
    }
}

/// A column of a result row was missing or held the wrong kind of value.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("column '{0}' is not present in the result")]
    MissingColumn(String),

    #[error("column '{0}' is NULL")]
    UnexpectedNull(String),

    #[error("column '{column}' holds {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column '{column}' holds an invalid value: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("column '{column}' could not be read: {reason}")]
    Unreadable { column: String, reason: String },
}
