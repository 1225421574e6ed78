//! Shared test utilities for examgen-db unit tests.

use examgen_core::entities::{AnswerOption, Question, Subject, Topic};
use examgen_core::enums::GradeLevel;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::ExamDb;
use crate::repos::{QuestionRepository, SubjectRepository, TopicRepository};

/// Install a test-friendly subscriber once. Filter comes from `EXAMGEN_LOG`.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_env("EXAMGEN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A fresh directory and a database path inside it.
pub fn temp_db_path() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bank.db").to_string_lossy().into_owned();
    (dir, path)
}

/// In-memory store with the schema applied.
pub async fn memory_db() -> ExamDb {
    ExamDb::open_local(":memory:").await.unwrap()
}

/// File-backed store; keep the `TempDir` alive for the test's duration.
pub async fn file_db() -> (TempDir, ExamDb) {
    let (dir, path) = temp_db_path();
    let db = ExamDb::open_local(&path).await.unwrap();
    (dir, db)
}

/// A question with options a (correct), b, c.
pub fn sample_question(topic_id: i64, statement: &str) -> Question {
    let mut question = Question::new(statement, topic_id);
    question.add_option(AnswerOption::new('a', "first", true));
    question.add_option(AnswerOption::new('b', "second", false));
    question.add_option(AnswerOption::new('c', "third", false));
    question
}

/// Store a subject with `(topic name, question count)` topics and return the
/// full tree as stored.
pub async fn seed_subject(db: &ExamDb, name: &str, topics: &[(&str, usize)]) -> Subject {
    let subjects = SubjectRepository::with_db(db.clone());
    let topic_repo = TopicRepository::with_db(db.clone());
    let questions = QuestionRepository::new(db.clone());

    let mut subject = Subject::new(name);
    subjects.insert(&mut subject).await.unwrap();

    for (idx, (topic_name, count)) in topics.iter().enumerate() {
        let grade = GradeLevel::ALL[idx % GradeLevel::ALL.len()];
        let mut topic = Topic::new(*topic_name, grade, subject.id);
        topic_repo.insert(&mut topic).await.unwrap();

        for n in 0..*count {
            let mut question = sample_question(topic.id, &format!("{topic_name} question {n}"));
            questions.insert(&mut question).await.unwrap();
            topic.add_question(question);
        }
        subject.add_topic(topic);
    }
    subject
}
