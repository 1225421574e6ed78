//! Generic CRUD engine parameterized over an entity mapper.
//!
//! Each public operation takes its own connection from [`ExamDb`] and drops
//! it on every exit path. The `*_with_conn` variants run on a caller-supplied
//! connection or transaction instead, so several operations can share one
//! atomic scope.
//!
//! `update` and `delete` report the number of rows they touched and never
//! fail because nothing matched. Callers needing an existence guarantee
//! check [`Repository::exists`] first.

use examgen_core::entities::Entity;
use tracing::debug;

use crate::ExamDb;
use crate::error::DatabaseError;
use crate::mapping::{ColumnIndex, Command, ResultRow, RowMapper};

/// SQL text for one entity's CRUD operations.
///
/// Statements bind by name. `insert` must end in `RETURNING id`; `update`,
/// `delete`, `exists`, and `select_by_id` key on `:id`; `exists` selects a
/// single count column.
#[derive(Debug, Clone, Copy)]
pub struct SqlStatements {
    /// Table name, for log lines and error messages.
    pub table: &'static str,
    pub insert: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
    pub exists: &'static str,
    pub select_by_id: &'static str,
    pub select_all: &'static str,
}

/// CRUD over the table described by `sql`, mapped through `M`.
#[derive(Clone)]
pub struct Repository<M: RowMapper> {
    db: ExamDb,
    mapper: M,
    sql: SqlStatements,
}

impl<M: RowMapper> Repository<M> {
    #[must_use]
    pub const fn new(db: ExamDb, mapper: M, sql: SqlStatements) -> Self {
        Self { db, mapper, sql }
    }

    #[must_use]
    pub const fn db(&self) -> &ExamDb {
        &self.db
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    #[must_use]
    pub const fn statements(&self) -> &SqlStatements {
        &self.sql
    }

    /// Insert `entity` and write the store-assigned id back into it.
    ///
    /// # Errors
    ///
    /// `Validation` if the entity breaks an invariant (nothing is sent to the
    /// store), `Persistence` on constraint violations.
    pub async fn insert(&self, entity: &mut M::Entity) -> Result<(), DatabaseError> {
        let conn = self.db.connect().await?;
        self.insert_with_conn(&conn, entity).await
    }

    /// [`Self::insert`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert`].
    pub async fn insert_with_conn(
        &self,
        conn: &libsql::Connection,
        entity: &mut M::Entity,
    ) -> Result<(), DatabaseError> {
        entity.validate()?;

        let mut command = Command::new();
        self.mapper.configure_parameters(&mut command, entity);

        let mut rows = conn.query(self.sql.insert, command.into_params()).await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::Persistence(format!("insert into {} returned no id", self.sql.table))
        })?;
        let id = row.get::<i64>(0)?;
        entity.set_id(id);

        debug!(table = self.sql.table, id, "inserted");
        Ok(())
    }

    /// Overwrite the stored row keyed by `entity.id()`.
    ///
    /// Returns the number of rows changed; zero is not an error.
    ///
    /// # Errors
    ///
    /// `Validation` for an invalid entity, `Persistence` on constraint
    /// violations.
    pub async fn update(&self, entity: &M::Entity) -> Result<u64, DatabaseError> {
        let conn = self.db.connect().await?;
        self.update_with_conn(&conn, entity).await
    }

    /// [`Self::update`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update`].
    pub async fn update_with_conn(
        &self,
        conn: &libsql::Connection,
        entity: &M::Entity,
    ) -> Result<u64, DatabaseError> {
        entity.validate()?;

        let mut command = Command::new();
        self.mapper.configure_parameters(&mut command, entity);
        command.bind("id", entity.id());

        let affected = conn.execute(self.sql.update, command.into_params()).await?;
        debug!(table = self.sql.table, id = entity.id(), affected, "updated");
        Ok(affected)
    }

    /// Delete the row keyed by `entity.id()`. Returns the rows removed.
    ///
    /// # Errors
    ///
    /// `Persistence` when other rows still reference this one and the
    /// foreign key restricts deletion.
    pub async fn delete(&self, entity: &M::Entity) -> Result<u64, DatabaseError> {
        let conn = self.db.connect().await?;
        self.delete_with_conn(&conn, entity).await
    }

    /// [`Self::delete`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::delete`].
    pub async fn delete_with_conn(
        &self,
        conn: &libsql::Connection,
        entity: &M::Entity,
    ) -> Result<u64, DatabaseError> {
        let id = entity.id();
        let affected = conn
            .execute(self.sql.delete, Command::new().with("id", id).into_params())
            .await?;
        debug!(table = self.sql.table, id, affected, "deleted");
        Ok(affected)
    }

    /// Whether a row with `entity.id()` exists.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists(&self, entity: &M::Entity) -> Result<bool, DatabaseError> {
        self.exists_id(entity.id()).await
    }

    /// Whether a row with `id` exists.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists_id(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.db.connect().await?;
        self.exists_id_with_conn(&conn, id).await
    }

    /// [`Self::exists_id`] on an existing connection.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists_id_with_conn(
        &self,
        conn: &libsql::Connection,
        id: i64,
    ) -> Result<bool, DatabaseError> {
        let count = count_with_conn(conn, self.sql.exists, Command::new().with("id", id)).await?;
        Ok(count > 0)
    }

    /// The entity with `id`, or `None`.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` if the row is malformed.
    pub async fn select_by_id(&self, id: i64) -> Result<Option<M::Entity>, DatabaseError> {
        let conn = self.db.connect().await?;
        self.select_by_id_with_conn(&conn, id).await
    }

    /// [`Self::select_by_id`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_by_id`].
    pub async fn select_by_id_with_conn(
        &self,
        conn: &libsql::Connection,
        id: i64,
    ) -> Result<Option<M::Entity>, DatabaseError> {
        self.select_one_by_filter_with_conn(
            conn,
            self.sql.select_by_id,
            Command::new().with("id", id),
        )
        .await
    }

    /// Every row, in the order `select_all` asks for.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` if a row is malformed.
    pub async fn select_all(&self) -> Result<Vec<M::Entity>, DatabaseError> {
        self.select_all_by_filter(self.sql.select_all, Command::new())
            .await
    }

    /// Run an arbitrary read query and map every row.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` if a row lacks a column
    /// the mapper needs.
    pub async fn select_all_by_filter(
        &self,
        sql: &str,
        command: Command,
    ) -> Result<Vec<M::Entity>, DatabaseError> {
        let conn = self.db.connect().await?;
        self.select_all_by_filter_with_conn(&conn, sql, command).await
    }

    /// [`Self::select_all_by_filter`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_all_by_filter`].
    pub async fn select_all_by_filter_with_conn(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        command: Command,
    ) -> Result<Vec<M::Entity>, DatabaseError> {
        let mut rows = conn.query(sql, command.into_params()).await?;
        let columns = ColumnIndex::from_rows(&rows);

        let mut entities = Vec::new();
        while let Some(row) = rows.next().await? {
            entities.push(self.mapper.map_row(&ResultRow::new(&row, &columns))?);
        }
        debug!(table = self.sql.table, count = entities.len(), "selected");
        Ok(entities)
    }

    /// Run an arbitrary read query and map its first row, if any.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_all_by_filter`].
    pub async fn select_one_by_filter(
        &self,
        sql: &str,
        command: Command,
    ) -> Result<Option<M::Entity>, DatabaseError> {
        let conn = self.db.connect().await?;
        self.select_one_by_filter_with_conn(&conn, sql, command)
            .await
    }

    /// [`Self::select_one_by_filter`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_all_by_filter`].
    pub async fn select_one_by_filter_with_conn(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        command: Command,
    ) -> Result<Option<M::Entity>, DatabaseError> {
        let mut rows = conn.query(sql, command.into_params()).await?;
        let columns = ColumnIndex::from_rows(&rows);
        match rows.next().await? {
            Some(row) => Ok(Some(self.mapper.map_row(&ResultRow::new(&row, &columns))?)),
            None => Ok(None),
        }
    }

    /// Run a query whose first column is a count.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` if the count is not an
    /// integer.
    pub async fn count_by_filter(&self, sql: &str, command: Command) -> Result<i64, DatabaseError> {
        let conn = self.db.connect().await?;
        count_with_conn(&conn, sql, command).await
    }

    /// Run a write statement that is not covered by the CRUD set.
    ///
    /// # Errors
    ///
    /// `Persistence` if the statement fails.
    pub async fn execute_with_conn(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        command: Command,
    ) -> Result<u64, DatabaseError> {
        let affected = conn.execute(sql, command.into_params()).await?;
        debug!(table = self.sql.table, affected, "executed");
        Ok(affected)
    }
}

async fn count_with_conn(
    conn: &libsql::Connection,
    sql: &str,
    command: Command,
) -> Result<i64, DatabaseError> {
    let mut rows = conn.query(sql, command.into_params()).await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| DatabaseError::Persistence(format!("count query returned no row: {sql}")))?;
    match row.get_value(0)? {
        libsql::Value::Integer(n) => Ok(n),
        other => Err(crate::error::MappingError::TypeMismatch {
            column: "count".into(),
            expected: "INTEGER",
            found: crate::helpers::value_kind(&other),
        }
        .into()),
    }
}
