//! Cross-cutting error types for examgen.
//!
//! In-memory invariant violations are raised here, before anything reaches
//! the store. Storage failures live in `examgen_db::error::DatabaseError`,
//! which wraps this type.

use thiserror::Error;

/// Errors that can be raised by any examgen crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (aggregate invariants, bounds, formats).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
