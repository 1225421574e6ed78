//! Subject repository: CRUD plus name lookups and tree loading.

use examgen_core::entities::Subject;

use crate::ExamDb;
use crate::error::DatabaseError;
use crate::loading::{self, LoadOptions};
use crate::mappers::SubjectMapper;
use crate::mapping::Command;
use crate::repository::{Repository, SqlStatements};

pub const SUBJECT_SQL: SqlStatements = SqlStatements {
    table: "subjects",
    insert: "INSERT INTO subjects (name) VALUES (:name) RETURNING id",
    update: "UPDATE subjects SET name = :name WHERE id = :id",
    delete: "DELETE FROM subjects WHERE id = :id",
    exists: "SELECT COUNT(*) FROM subjects WHERE id = :id",
    select_by_id: "SELECT s.id AS subject_id, s.name AS subject_name \
                   FROM subjects s WHERE s.id = :id",
    select_all: "SELECT s.id AS subject_id, s.name AS subject_name \
                 FROM subjects s ORDER BY s.id",
};

const SELECT_BY_NAME: &str = "SELECT s.id AS subject_id, s.name AS subject_name \
                              FROM subjects s WHERE s.name = :name";

const COUNT_BY_NAME: &str = "SELECT COUNT(*) FROM subjects WHERE name = :name";

pub type SubjectRepository = Repository<SubjectMapper>;

impl Repository<SubjectMapper> {
    #[must_use]
    pub const fn with_db(db: ExamDb) -> Self {
        Self::new(db, SubjectMapper, SUBJECT_SQL)
    }

    /// The subject named exactly `name`, if any.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn select_by_name(&self, name: &str) -> Result<Option<Subject>, DatabaseError> {
        self.select_one_by_filter(SELECT_BY_NAME, Command::new().with("name", name))
            .await
    }

    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists_by_name(&self, name: &str) -> Result<bool, DatabaseError> {
        let count = self
            .count_by_filter(COUNT_BY_NAME, Command::new().with("name", name))
            .await?;
        Ok(count > 0)
    }

    /// Every subject, ordered by id, with the requested child levels.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_all_with(
        &self,
        options: LoadOptions,
    ) -> Result<Vec<Subject>, DatabaseError> {
        let conn = self.db().connect().await?;
        loading::load_subjects(&conn, options.subject_depth(), None, Command::new()).await
    }

    /// One subject with the requested child levels.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_by_id_with(
        &self,
        id: i64,
        options: LoadOptions,
    ) -> Result<Option<Subject>, DatabaseError> {
        let conn = self.db().connect().await?;
        let subjects = loading::load_subjects(
            &conn,
            options.subject_depth(),
            Some("s.id = :id"),
            Command::new().with("id", id),
        )
        .await?;
        Ok(subjects.into_iter().next())
    }
}
