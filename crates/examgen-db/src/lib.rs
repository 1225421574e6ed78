//! # examgen-db
//!
//! libSQL persistence for the examgen question bank.
//!
//! Holds the store handle, the embedded schema, the row-mapping layer, a
//! generic CRUD [`Repository`](repository::Repository) parameterized over an
//! entity mapper, the per-aggregate repositories built on it, and the
//! [`TestAssembler`](assembly::TestAssembler) that draws unused questions
//! into generated tests.
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) in local mode.

pub mod assembly;
pub mod error;
pub mod helpers;
pub mod loading;
pub mod mappers;
pub mod mapping;
mod migrations;
pub mod repository;
pub mod repos;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use examgen_config::DatabaseConfig;
use libsql::Builder;
use tracing::{debug, warn};

use error::DatabaseError;

const MEMORY_PATH: &str = ":memory:";

/// Central handle to the question bank store.
///
/// Cheap to clone; every repository holds one. File-backed stores hand out a
/// fresh connection per operation. An in-memory store lives and dies with
/// its connection, so that one connection is shared instead.
#[derive(Clone)]
pub struct ExamDb {
    inner: Arc<Inner>,
}

struct Inner {
    db: libsql::Database,
    shared: Option<libsql::Connection>,
    busy_timeout_ms: u64,
    path: String,
}

impl ExamDb {
    /// Open the store described by `config`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// `Validation` for an unusable config, otherwise `DatabaseError` if the
    /// database cannot be opened or migrations fail.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config
            .validate()
            .map_err(|e| DatabaseError::Validation(e.to_string()))?;
        Self::open_with_timeout(&config.path, config.busy_timeout_ms).await
    }

    /// Open a local database at `path` (or `:memory:`) with default settings.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open`].
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open(&DatabaseConfig::at_path(path)).await
    }

    async fn open_with_timeout(path: &str, busy_timeout_ms: u64) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;

        let shared = if path == MEMORY_PATH {
            let conn = db.connect()?;
            configure(&conn, busy_timeout_ms).await?;
            Some(conn)
        } else {
            None
        };

        let exam_db = Self {
            inner: Arc::new(Inner {
                db,
                shared,
                busy_timeout_ms,
                path: path.to_string(),
            }),
        };
        exam_db.run_migrations().await?;
        debug!(path, "question bank opened");
        Ok(exam_db)
    }

    /// A connection for one operation, with foreign keys enforced.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Persistence` if the store refuses the
    /// connection.
    pub async fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        if let Some(conn) = &self.inner.shared {
            return Ok(conn.clone());
        }
        let conn = self.inner.db.connect()?;
        configure(&conn, self.inner.busy_timeout_ms).await?;
        Ok(conn)
    }

    /// Location the store was opened from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.inner.shared.is_some()
    }
}

/// Per-connection pragmas. Neither setting survives on a new connection.
async fn configure(conn: &libsql::Connection, busy_timeout_ms: u64) -> Result<(), DatabaseError> {
    conn.execute("PRAGMA foreign_keys = ON", ())
        .await
        .map_err(|e| DatabaseError::Persistence(format!("PRAGMA foreign_keys: {e}")))?;

    // busy_timeout echoes the new value back as a row; step it so it applies.
    let mut rows = conn
        .query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"), ())
        .await
        .map_err(|e| DatabaseError::Persistence(format!("PRAGMA busy_timeout: {e}")))?;
    while rows.next().await?.is_some() {}
    Ok(())
}

/// Finish a transaction: commit on success, roll back on failure.
///
/// The failure that caused a rollback is what the caller sees; a failing
/// rollback is only logged.
pub(crate) async fn commit_or_rollback<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            warn!(error = %e, "rolling back transaction");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
