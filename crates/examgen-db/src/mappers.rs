//! Row mappers for each stored entity.
//!
//! Column names follow the `<entity>_<field>` alias convention described in
//! [`crate::mapping`]. The `*_COLUMNS` lists below produce those aliases from
//! the table aliases `s`, `t`, `q`, `o`, and `x` used by every query.

use examgen_core::entities::{AnswerOption, Question, Subject, Test, Topic};

use crate::error::MappingError;
use crate::mapping::{Command, ResultRow, RowMapper};

pub(crate) const SUBJECT_COLUMNS: &str = "s.id AS subject_id, s.name AS subject_name";

pub(crate) const TOPIC_COLUMNS: &str = "t.id AS topic_id, t.name AS topic_name, \
     t.grade AS topic_grade, t.subject_id AS topic_subject_id";

pub(crate) const QUESTION_COLUMNS: &str = "q.id AS question_id, q.statement AS question_statement, \
     q.topic_id AS question_topic_id, q.used AS question_used";

pub(crate) const OPTION_COLUMNS: &str = "o.id AS option_id, o.letter AS option_letter, \
     o.answer AS option_answer, o.correct AS option_correct, o.question_id AS option_question_id";

pub(crate) const TEST_COLUMNS: &str = "x.id AS test_id, x.title AS test_title, \
     x.generated_at AS test_generated_at, x.subject_id AS test_subject_id, \
     x.topic_id AS test_topic_id, x.question_count AS test_question_count, \
     x.comprehensive AS test_comprehensive";

#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectMapper;

impl RowMapper for SubjectMapper {
    type Entity = Subject;
    const ID_COLUMN: &'static str = "subject_id";

    fn configure_parameters(&self, command: &mut Command, subject: &Subject) {
        command.bind("name", subject.name.as_str());
    }

    fn map_row(&self, row: &ResultRow<'_>) -> Result<Subject, MappingError> {
        Ok(Subject {
            id: row.get("subject_id")?,
            name: row.get("subject_name")?,
            topics: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopicMapper;

impl RowMapper for TopicMapper {
    type Entity = Topic;
    const ID_COLUMN: &'static str = "topic_id";

    fn configure_parameters(&self, command: &mut Command, topic: &Topic) {
        command
            .bind("name", topic.name.as_str())
            .bind("grade", topic.grade)
            .bind("subject_id", topic.subject_id);
    }

    fn map_row(&self, row: &ResultRow<'_>) -> Result<Topic, MappingError> {
        Ok(Topic {
            id: row.get("topic_id")?,
            name: row.get("topic_name")?,
            grade: row.get("topic_grade")?,
            subject_id: row.get("topic_subject_id")?,
            questions: Vec::new(),
        })
    }
}

/// Maps the question row only; options are folded in by the loaders.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionMapper;

impl RowMapper for QuestionMapper {
    type Entity = Question;
    const ID_COLUMN: &'static str = "question_id";

    fn configure_parameters(&self, command: &mut Command, question: &Question) {
        command
            .bind("statement", question.statement.as_str())
            .bind("topic_id", question.topic_id)
            .bind("used", question.used);
    }

    fn map_row(&self, row: &ResultRow<'_>) -> Result<Question, MappingError> {
        Ok(Question {
            id: row.get("question_id")?,
            statement: row.get("question_statement")?,
            topic_id: row.get("question_topic_id")?,
            used: row.get("question_used")?,
            options: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerOptionMapper;

impl RowMapper for AnswerOptionMapper {
    type Entity = AnswerOption;
    const ID_COLUMN: &'static str = "option_id";

    fn configure_parameters(&self, command: &mut Command, option: &AnswerOption) {
        command
            .bind("letter", option.letter)
            .bind("answer", option.answer.as_str())
            .bind("correct", option.correct)
            .bind("question_id", option.question_id);
    }

    fn map_row(&self, row: &ResultRow<'_>) -> Result<AnswerOption, MappingError> {
        Ok(AnswerOption {
            id: row.get("option_id")?,
            letter: row.get("option_letter")?,
            answer: row.get("option_answer")?,
            correct: row.get("option_correct")?,
            question_id: row.get("option_question_id")?,
        })
    }
}

/// Maps the test header; the question snapshot is loaded separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestMapper;

impl RowMapper for TestMapper {
    type Entity = Test;
    const ID_COLUMN: &'static str = "test_id";

    fn configure_parameters(&self, command: &mut Command, test: &Test) {
        command
            .bind("title", test.title.as_str())
            .bind("generated_at", test.generated_at)
            .bind("subject_id", test.subject_id)
            .bind("topic_id", test.topic_id)
            .bind("question_count", test.question_count)
            .bind("comprehensive", test.comprehensive);
    }

    fn map_row(&self, row: &ResultRow<'_>) -> Result<Test, MappingError> {
        Ok(Test {
            id: row.get("test_id")?,
            title: row.get("test_title")?,
            generated_at: row.get("test_generated_at")?,
            subject_id: row.get("test_subject_id")?,
            topic_id: row.get_opt("test_topic_id")?,
            question_count: row.get("test_question_count")?,
            comprehensive: row.get("test_comprehensive")?,
            questions: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use examgen_core::enums::GradeLevel;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mapping::ColumnIndex;
    use crate::test_support::memory_db;

    /// Run `sql` and map its first row with `mapper`.
    async fn map_first<M: RowMapper>(
        mapper: &M,
        sql: &str,
    ) -> Result<Option<M::Entity>, MappingError> {
        let db = memory_db().await;
        let conn = db.connect().await.unwrap();
        let mut rows = conn.query(sql, ()).await.unwrap();
        let columns = ColumnIndex::from_rows(&rows);
        let row = rows.next().await.unwrap().unwrap();
        mapper.map_optional(&ResultRow::new(&row, &columns))
    }

    #[tokio::test]
    async fn topic_from_aliased_columns() {
        let topic = map_first(
            &TopicMapper,
            "SELECT 4 AS topic_id, 'Fractions' AS topic_name, 5 AS topic_grade, 2 AS topic_subject_id",
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            topic,
            Topic {
                id: 4,
                name: "Fractions".into(),
                grade: GradeLevel::Fifth,
                subject_id: 2,
                questions: Vec::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_header_with_null_topic() {
        let test = map_first(
            &TestMapper,
            "SELECT 1 AS test_id, 'Final' AS test_title, '2026-02-09T14:30:00+00:00' AS test_generated_at, \
             3 AS test_subject_id, NULL AS test_topic_id, 20 AS test_question_count, 1 AS test_comprehensive",
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(test.topic_id, None);
        assert!(test.comprehensive);
        assert_eq!(test.question_count, 20);
        assert_eq!(
            test.generated_at,
            Utc.with_ymd_and_hms(2026, 2, 9, 14, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn null_identity_maps_to_none() {
        let option = map_first(
            &AnswerOptionMapper,
            "SELECT NULL AS option_id, NULL AS option_letter, NULL AS option_answer, \
             NULL AS option_correct, NULL AS option_question_id",
        )
        .await
        .unwrap();
        assert!(option.is_none());
    }

    #[tokio::test]
    async fn missing_column_is_a_mapping_error() {
        let err = map_first(&SubjectMapper, "SELECT 1 AS subject_id")
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::MissingColumn(c) if c == "subject_name"));
    }

    #[tokio::test]
    async fn null_in_required_column_is_not_defaulted() {
        let err = map_first(
            &QuestionMapper,
            "SELECT 1 AS question_id, 'Why?' AS question_statement, 2 AS question_topic_id, NULL AS question_used",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MappingError::UnexpectedNull(c) if c == "question_used"));
    }

    #[test]
    fn parameters_cover_every_persisted_field() {
        let mut command = Command::new();
        let mut option = AnswerOption::new('b', "Paris", true);
        option.question_id = 9;
        AnswerOptionMapper.configure_parameters(&mut command, &option);

        for name in ["letter", "answer", "correct", "question_id"] {
            assert!(command.is_bound(name), "{name} should be bound");
        }
        assert!(!command.is_bound("id"));
    }
}
