//! Topic repository.

use examgen_core::entities::Topic;

use crate::ExamDb;
use crate::error::DatabaseError;
use crate::loading::{self, LoadOptions};
use crate::mappers::TopicMapper;
use crate::mapping::Command;
use crate::repository::{Repository, SqlStatements};

pub const TOPIC_SQL: SqlStatements = SqlStatements {
    table: "topics",
    insert: "INSERT INTO topics (name, grade, subject_id) \
             VALUES (:name, :grade, :subject_id) RETURNING id",
    update: "UPDATE topics SET name = :name, grade = :grade, subject_id = :subject_id \
             WHERE id = :id",
    delete: "DELETE FROM topics WHERE id = :id",
    exists: "SELECT COUNT(*) FROM topics WHERE id = :id",
    select_by_id: "SELECT t.id AS topic_id, t.name AS topic_name, t.grade AS topic_grade, \
                   t.subject_id AS topic_subject_id FROM topics t WHERE t.id = :id",
    select_all: "SELECT t.id AS topic_id, t.name AS topic_name, t.grade AS topic_grade, \
                 t.subject_id AS topic_subject_id FROM topics t ORDER BY t.id",
};

const SELECT_BY_NAME: &str = "SELECT t.id AS topic_id, t.name AS topic_name, \
     t.grade AS topic_grade, t.subject_id AS topic_subject_id \
     FROM topics t WHERE t.subject_id = :subject_id AND t.name = :name";

const COUNT_BY_NAME: &str =
    "SELECT COUNT(*) FROM topics WHERE subject_id = :subject_id AND name = :name";

pub type TopicRepository = Repository<TopicMapper>;

impl Repository<TopicMapper> {
    #[must_use]
    pub const fn with_db(db: ExamDb) -> Self {
        Self::new(db, TopicMapper, TOPIC_SQL)
    }

    /// The topic of `subject_id` named exactly `name`. Names are unique per
    /// subject, so there is at most one.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn select_by_name(
        &self,
        subject_id: i64,
        name: &str,
    ) -> Result<Option<Topic>, DatabaseError> {
        let command = Command::new()
            .with("subject_id", subject_id)
            .with("name", name);
        self.select_one_by_filter(SELECT_BY_NAME, command).await
    }

    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists_by_name(&self, subject_id: i64, name: &str) -> Result<bool, DatabaseError> {
        let command = Command::new()
            .with("subject_id", subject_id)
            .with("name", name);
        Ok(self.count_by_filter(COUNT_BY_NAME, command).await? > 0)
    }

    /// Topics of one subject, ordered by id, without children.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn select_by_subject(&self, subject_id: i64) -> Result<Vec<Topic>, DatabaseError> {
        self.select_by_subject_with(subject_id, LoadOptions::SHALLOW)
            .await
    }

    /// Topics of one subject with the requested child levels.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_by_subject_with(
        &self,
        subject_id: i64,
        options: LoadOptions,
    ) -> Result<Vec<Topic>, DatabaseError> {
        let conn = self.db().connect().await?;
        loading::load_topics(
            &conn,
            options.topic_depth(),
            Some("t.subject_id = :subject_id"),
            Command::new().with("subject_id", subject_id),
        )
        .await
    }

    /// Every topic with the requested child levels. `options.topics` is
    /// implied.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_all_with(&self, options: LoadOptions) -> Result<Vec<Topic>, DatabaseError> {
        let conn = self.db().connect().await?;
        loading::load_topics(&conn, options.topic_depth(), None, Command::new()).await
    }
}
