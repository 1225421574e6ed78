//! Question repository.
//!
//! A question and its answer options are one aggregate: they are inserted,
//! replaced, and deleted together inside a single transaction. Options are
//! removed by the `ON DELETE CASCADE` on `answer_options.question_id`.

use examgen_core::UNASSIGNED_ID;
use examgen_core::entities::{Entity, Question};
use tracing::debug;

use crate::error::DatabaseError;
use crate::mappers::{AnswerOptionMapper, QuestionMapper};
use crate::mapping::Command;
use crate::repository::{Repository, SqlStatements};
use crate::{ExamDb, commit_or_rollback, loading};

pub const QUESTION_SQL: SqlStatements = SqlStatements {
    table: "questions",
    insert: "INSERT INTO questions (statement, topic_id, used) \
             VALUES (:statement, :topic_id, :used) RETURNING id",
    update: "UPDATE questions SET statement = :statement, topic_id = :topic_id, used = :used \
             WHERE id = :id",
    delete: "DELETE FROM questions WHERE id = :id",
    exists: "SELECT COUNT(*) FROM questions WHERE id = :id",
    select_by_id: "SELECT q.id AS question_id, q.statement AS question_statement, \
                   q.topic_id AS question_topic_id, q.used AS question_used \
                   FROM questions q WHERE q.id = :id",
    select_all: "SELECT q.id AS question_id, q.statement AS question_statement, \
                 q.topic_id AS question_topic_id, q.used AS question_used \
                 FROM questions q ORDER BY q.id",
};

pub const ANSWER_OPTION_SQL: SqlStatements = SqlStatements {
    table: "answer_options",
    insert: "INSERT INTO answer_options (letter, answer, correct, question_id) \
             VALUES (:letter, :answer, :correct, :question_id) RETURNING id",
    update: "UPDATE answer_options SET letter = :letter, answer = :answer, \
             correct = :correct, question_id = :question_id WHERE id = :id",
    delete: "DELETE FROM answer_options WHERE id = :id",
    exists: "SELECT COUNT(*) FROM answer_options WHERE id = :id",
    select_by_id: "SELECT o.id AS option_id, o.letter AS option_letter, o.answer AS option_answer, \
                   o.correct AS option_correct, o.question_id AS option_question_id \
                   FROM answer_options o WHERE o.id = :id",
    select_all: "SELECT o.id AS option_id, o.letter AS option_letter, o.answer AS option_answer, \
                 o.correct AS option_correct, o.question_id AS option_question_id \
                 FROM answer_options o ORDER BY o.id",
};

const DELETE_OPTIONS: &str = "DELETE FROM answer_options WHERE question_id = :question_id";

const SET_USED: &str = "UPDATE questions SET used = :used WHERE id = :id";

const RESET_SUBJECT: &str = "UPDATE questions SET used = 0 \
     WHERE used = 1 AND topic_id IN (SELECT id FROM topics WHERE subject_id = :subject_id)";

const UNUSED_IN_SUBJECT: &str =
    "q.used = 0 AND q.topic_id IN (SELECT id FROM topics WHERE subject_id = :subject_id)";

const UNUSED_IN_TOPIC: &str = "q.used = 0 AND q.topic_id = :topic_id \
     AND q.topic_id IN (SELECT id FROM topics WHERE subject_id = :subject_id)";

/// Questions with their answer options.
#[derive(Clone)]
pub struct QuestionRepository {
    questions: Repository<QuestionMapper>,
    options: Repository<AnswerOptionMapper>,
}

impl QuestionRepository {
    #[must_use]
    pub fn new(db: ExamDb) -> Self {
        Self {
            questions: Repository::new(db.clone(), QuestionMapper, QUESTION_SQL),
            options: Repository::new(db, AnswerOptionMapper, ANSWER_OPTION_SQL),
        }
    }

    /// Row-level access to the `answer_options` table.
    #[must_use]
    pub const fn option_rows(&self) -> &Repository<AnswerOptionMapper> {
        &self.options
    }

    /// Insert a question and all of its options atomically.
    ///
    /// On failure nothing is stored and every id stays unassigned.
    ///
    /// # Errors
    ///
    /// `Validation` if the question does not have exactly one correct
    /// option (nothing reaches the store), `Persistence` on constraint
    /// violations such as a missing topic.
    pub async fn insert(&self, question: &mut Question) -> Result<(), DatabaseError> {
        question.validate()?;

        let conn = self.questions.db().connect().await?;
        let tx = conn.transaction().await?;
        let result = self.insert_with_conn(&tx, question).await;
        let result = commit_or_rollback(tx, result).await;

        if result.is_err() {
            question.set_id(UNASSIGNED_ID);
            for option in &mut question.options {
                option.id = UNASSIGNED_ID;
            }
        }
        result
    }

    /// [`Self::insert`] on a caller-managed connection or transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert`]; ids are left as assigned so far.
    pub async fn insert_with_conn(
        &self,
        conn: &libsql::Connection,
        question: &mut Question,
    ) -> Result<(), DatabaseError> {
        self.questions.insert_with_conn(conn, question).await?;
        for option in &mut question.options {
            self.options.insert_with_conn(conn, option).await?;
        }
        Ok(())
    }

    /// Overwrite a question and replace its option set.
    ///
    /// Returns the number of question rows changed. When no row matches,
    /// nothing else is touched and the result is `0`, not an error.
    ///
    /// On failure the store is unchanged and the options keep the ids they
    /// had before the call.
    ///
    /// # Errors
    ///
    /// `Validation` for an invalid question, `Persistence` on constraint
    /// violations.
    pub async fn update(&self, question: &mut Question) -> Result<u64, DatabaseError> {
        question.validate()?;
        question.link_options();
        let previous_ids: Vec<i64> = question.options.iter().map(|o| o.id).collect();

        let conn = self.questions.db().connect().await?;
        let tx = conn.transaction().await?;
        let result = async {
            let affected = self.questions.update_with_conn(&tx, question).await?;
            if affected > 0 {
                self.options
                    .execute_with_conn(
                        &tx,
                        DELETE_OPTIONS,
                        Command::new().with("question_id", question.id),
                    )
                    .await?;
                for option in &mut question.options {
                    self.options.insert_with_conn(&tx, option).await?;
                }
            }
            Ok::<_, DatabaseError>(affected)
        }
        .await;
        let result = commit_or_rollback(tx, result).await;

        if result.is_err() {
            for (option, id) in question.options.iter_mut().zip(previous_ids) {
                option.id = id;
            }
        }
        result
    }

    /// Delete a question; its options and test associations go with it.
    ///
    /// # Errors
    ///
    /// `Persistence` if the statement fails.
    pub async fn delete(&self, question: &Question) -> Result<u64, DatabaseError> {
        self.questions.delete(question).await
    }

    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn exists(&self, question: &Question) -> Result<bool, DatabaseError> {
        self.questions.exists(question).await
    }

    /// One question with its options, or `None`.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_by_id(&self, id: i64) -> Result<Option<Question>, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        let questions =
            loading::load_questions(&conn, Some("q.id = :id"), Command::new().with("id", id))
                .await?;
        Ok(questions.into_iter().next())
    }

    /// Every question with its options, ordered by id.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_all(&self) -> Result<Vec<Question>, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        loading::load_questions(&conn, None, Command::new()).await
    }

    /// Questions of one topic with their options, ordered by id.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_by_topic(&self, topic_id: i64) -> Result<Vec<Question>, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        loading::load_questions(
            &conn,
            Some("q.topic_id = :topic_id"),
            Command::new().with("topic_id", topic_id),
        )
        .await
    }

    /// Unused questions of a subject, or of one of its topics, with options.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails, `Mapping` for malformed rows.
    pub async fn select_unused(
        &self,
        subject_id: i64,
        topic_id: Option<i64>,
    ) -> Result<Vec<Question>, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        self.select_unused_with_conn(&conn, subject_id, topic_id)
            .await
    }

    /// [`Self::select_unused`] on an existing connection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_unused`].
    pub async fn select_unused_with_conn(
        &self,
        conn: &libsql::Connection,
        subject_id: i64,
        topic_id: Option<i64>,
    ) -> Result<Vec<Question>, DatabaseError> {
        let command = Command::new().with("subject_id", subject_id);
        match topic_id {
            Some(topic_id) => {
                loading::load_questions(
                    conn,
                    Some(UNUSED_IN_TOPIC),
                    command.with("topic_id", topic_id),
                )
                .await
            }
            None => loading::load_questions(conn, Some(UNUSED_IN_SUBJECT), command).await,
        }
    }

    /// Flag a question as drawn into a test.
    ///
    /// # Errors
    ///
    /// `Persistence` if the statement fails.
    pub async fn mark_used_with_conn(
        &self,
        conn: &libsql::Connection,
        id: i64,
    ) -> Result<u64, DatabaseError> {
        self.set_used(conn, id, true).await
    }

    /// Put one question back into the pool. The only way back from used.
    ///
    /// # Errors
    ///
    /// `Persistence` if the statement fails.
    pub async fn mark_unused(&self, id: i64) -> Result<u64, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        self.set_used(&conn, id, false).await
    }

    /// Put every question of a subject back into the pool. Returns how many
    /// questions changed.
    ///
    /// # Errors
    ///
    /// `Persistence` if the statement fails.
    pub async fn reset_usage_for_subject(&self, subject_id: i64) -> Result<u64, DatabaseError> {
        let conn = self.questions.db().connect().await?;
        let reset = self
            .questions
            .execute_with_conn(
                &conn,
                RESET_SUBJECT,
                Command::new().with("subject_id", subject_id),
            )
            .await?;
        debug!(subject_id, reset, "question usage reset");
        Ok(reset)
    }

    async fn set_used(
        &self,
        conn: &libsql::Connection,
        id: i64,
        used: bool,
    ) -> Result<u64, DatabaseError> {
        let command = Command::new().with("used", used).with("id", id);
        self.questions.execute_with_conn(conn, SET_USED, command).await
    }
}

#[cfg(test)]
mod tests {
    use examgen_core::entities::{AnswerOption, CorrectAnswer};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::{init_test_tracing, memory_db, sample_question, seed_subject};

    async fn bank() -> (QuestionRepository, i64, Vec<i64>) {
        let db = memory_db().await;
        let subject = seed_subject(&db, "Geography", &[("Rivers", 0), ("Mountains", 0)]).await;
        let topic_ids = subject.topics.iter().map(|t| t.id).collect();
        (QuestionRepository::new(db), subject.id, topic_ids)
    }

    #[tokio::test]
    async fn aggregate_round_trip() {
        init_test_tracing();
        let (repo, _, topics) = bank().await;

        let mut question = sample_question(topics[0], "Longest river in Africa?");
        repo.insert(&mut question).await.unwrap();

        assert!(question.id > 0);
        assert!(question.options.iter().all(|o| o.id > 0 && o.question_id == question.id));
        let loaded = repo.select_by_id(question.id).await.unwrap().unwrap();
        assert_eq!(loaded, question);
        assert_eq!(
            loaded.correct_option(),
            Some(CorrectAnswer {
                id: question.options[0].id,
                letter: 'a',
            })
        );
    }

    #[tokio::test]
    async fn two_correct_options_are_rejected_before_the_store() {
        let (repo, _, topics) = bank().await;

        let mut question = Question::new("Pick one", topics[0]);
        question.add_option(AnswerOption::new('a', "This", true));
        question.add_option(AnswerOption::new('b', "That", true));

        let err = repo.insert(&mut question).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert!(repo.select_all().await.unwrap().is_empty());
        assert!(repo.option_rows().select_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_option_insert_rolls_back_the_question() {
        let (repo, _, topics) = bank().await;
        let conn = repo.questions.db().connect().await.unwrap();
        conn.execute(
            "CREATE TRIGGER reject_c BEFORE INSERT ON answer_options \
             WHEN NEW.letter = 'c' BEGIN SELECT RAISE(ABORT, 'no c'); END",
            (),
        )
        .await
        .unwrap();

        let mut question = sample_question(topics[0], "Highest peak?");
        let err = repo.insert(&mut question).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Persistence(_)), "got {err:?}");

        assert_eq!(question.id, UNASSIGNED_ID);
        assert!(question.options.iter().all(|o| o.id == UNASSIGNED_ID));
        assert!(repo.select_all().await.unwrap().is_empty());
        assert!(repo.option_rows().select_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_update_keeps_store_and_option_ids_in_step() {
        let (repo, _, topics) = bank().await;
        let mut question = sample_question(topics[0], "Deepest lake?");
        repo.insert(&mut question).await.unwrap();
        let stored = repo.select_by_id(question.id).await.unwrap().unwrap();
        let ids_before: Vec<_> = question.options.iter().map(|o| o.id).collect();

        let conn = repo.questions.db().connect().await.unwrap();
        conn.execute(
            "CREATE TRIGGER reject_b BEFORE INSERT ON answer_options \
             WHEN NEW.letter = 'b' BEGIN SELECT RAISE(ABORT, 'no b'); END",
            (),
        )
        .await
        .unwrap();

        question.statement = "Deepest lake on Earth?".into();
        let err = repo.update(&mut question).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Persistence(_)), "got {err:?}");

        let ids_after: Vec<_> = question.options.iter().map(|o| o.id).collect();
        assert_eq!(ids_after, ids_before);
        assert_eq!(repo.select_by_id(question.id).await.unwrap(), Some(stored));
        for option in &question.options {
            assert!(repo.option_rows().exists_id(option.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn update_replaces_the_option_set() {
        let (repo, _, topics) = bank().await;

        let mut question = sample_question(topics[0], "Which river flows north?");
        repo.insert(&mut question).await.unwrap();
        let old_option_ids: Vec<_> = question.options.iter().map(|o| o.id).collect();

        let mut edited = Question::new("Which river flows north through Egypt?", topics[1]);
        edited.add_option(AnswerOption::new('a', "Nile", true));
        edited.add_option(AnswerOption::new('b', "Congo", false));
        question.update_from(&edited);

        assert_eq!(repo.update(&mut question).await.unwrap(), 1);
        let loaded = repo.select_by_id(question.id).await.unwrap().unwrap();
        assert_eq!(loaded, question);
        assert_eq!(loaded.options.len(), 2);
        assert!(loaded.options.iter().all(|o| !old_option_ids.contains(&o.id)));
        assert_eq!(repo.option_rows().select_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_of_missing_question_changes_nothing() {
        let (repo, _, topics) = bank().await;

        let mut ghost = sample_question(topics[0], "Who am I?");
        ghost.set_id(404);
        assert_eq!(repo.update(&mut ghost).await.unwrap(), 0);
        assert!(repo.option_rows().select_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_options() {
        let (repo, _, topics) = bank().await;

        let mut keep = sample_question(topics[0], "Keep me");
        let mut doomed = sample_question(topics[0], "Drop me");
        repo.insert(&mut keep).await.unwrap();
        repo.insert(&mut doomed).await.unwrap();

        assert_eq!(repo.delete(&doomed).await.unwrap(), 1);
        assert!(!repo.exists(&doomed).await.unwrap());

        let remaining = repo.option_rows().select_all().await.unwrap();
        assert_eq!(remaining, keep.options);
    }

    #[tokio::test]
    async fn unused_pool_respects_scope_and_flags() {
        let (repo, subject_id, topics) = bank().await;

        let mut ids = Vec::new();
        for (topic, statement) in [(0, "r1"), (1, "m1"), (0, "r2"), (1, "m2")] {
            let mut q = sample_question(topics[topic], statement);
            repo.insert(&mut q).await.unwrap();
            ids.push(q.id);
        }

        let conn = repo.questions.db().connect().await.unwrap();
        repo.mark_used_with_conn(&conn, ids[0]).await.unwrap();

        let subject_pool = repo.select_unused(subject_id, None).await.unwrap();
        let pool_ids: Vec<_> = subject_pool.iter().map(|q| q.id).collect();
        assert_eq!(pool_ids, vec![ids[1], ids[2], ids[3]]);
        assert!(subject_pool.iter().all(|q| q.options.len() == 3));

        let topic_pool = repo.select_unused(subject_id, Some(topics[0])).await.unwrap();
        assert_eq!(topic_pool.len(), 1);
        assert_eq!(topic_pool[0].statement, "r2");

        assert!(repo.select_unused(subject_id + 1, None).await.unwrap().is_empty());
        assert!(
            repo.select_unused(subject_id + 1, Some(topics[0]))
                .await
                .unwrap()
                .is_empty()
        );

        assert_eq!(repo.mark_unused(ids[0]).await.unwrap(), 1);
        assert_eq!(repo.select_unused(subject_id, None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn reset_usage_only_touches_one_subject() {
        let db = memory_db().await;
        let geo = seed_subject(&db, "Geography", &[("Rivers", 2)]).await;
        let music = seed_subject(&db, "Music", &[("Rhythm", 1)]).await;
        let repo = QuestionRepository::new(db);

        let conn = repo.questions.db().connect().await.unwrap();
        for question in geo.all_questions().into_iter().chain(music.all_questions()) {
            repo.mark_used_with_conn(&conn, question.id).await.unwrap();
        }

        assert_eq!(repo.reset_usage_for_subject(geo.id).await.unwrap(), 2);
        assert_eq!(repo.select_unused(geo.id, None).await.unwrap().len(), 2);
        assert!(repo.select_unused(music.id, None).await.unwrap().is_empty());
    }
}
