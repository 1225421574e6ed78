//! Test generation: draw unused questions, flag them used, store the test.
//!
//! Everything a generation writes happens in one transaction. A failure at
//! any step leaves every question flag and the `tests` table as they were.
//!
//! Selection policy:
//! - a topic-restricted or standard request takes the first `n` questions of
//!   the pool (ascending id, or shuffled with a fixed seed);
//! - a comprehensive request deals questions round-robin across the
//!   subject's topics in ascending topic id, so with `n` at least the number
//!   of topics holding unused questions, every such topic contributes.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use examgen_config::GenerationConfig;
use examgen_core::entities::{Entity, Question, Test};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::error::DatabaseError;
use crate::repos::{QuestionRepository, SubjectRepository, TestRepository, TopicRepository};
use crate::{ExamDb, commit_or_rollback};

/// Fallback size when neither the request nor the config names one.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRequest {
    pub title: String,
    pub subject_id: i64,
    /// Restrict the pool to one topic of the subject.
    pub topic_id: Option<i64>,
    /// `None` uses the assembler's default count.
    pub question_count: Option<u32>,
    pub comprehensive: bool,
}

impl TestRequest {
    /// Standard test over every topic of a subject.
    #[must_use]
    pub fn for_subject(title: impl Into<String>, subject_id: i64) -> Self {
        Self {
            title: title.into(),
            subject_id,
            topic_id: None,
            question_count: None,
            comprehensive: false,
        }
    }

    /// Test drawn from a single topic.
    #[must_use]
    pub fn for_topic(title: impl Into<String>, subject_id: i64, topic_id: i64) -> Self {
        Self {
            topic_id: Some(topic_id),
            ..Self::for_subject(title, subject_id)
        }
    }

    /// Comprehensive test spread across all topics of a subject.
    #[must_use]
    pub fn comprehensive(title: impl Into<String>, subject_id: i64) -> Self {
        Self {
            comprehensive: true,
            ..Self::for_subject(title, subject_id)
        }
    }

    #[must_use]
    pub const fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = Some(count);
        self
    }
}

/// Order in which eligible questions are considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionOrder {
    /// Ascending question id.
    #[default]
    Sequential,
    /// Shuffled with a reproducible seed.
    Shuffled { seed: u64 },
}

impl SelectionOrder {
    #[must_use]
    pub const fn from_config(config: &GenerationConfig) -> Self {
        match (config.shuffle, config.seed) {
            (true, Some(seed)) => Self::Shuffled { seed },
            _ => Self::Sequential,
        }
    }
}

/// Generates tests against one store.
#[derive(Clone)]
pub struct TestAssembler {
    db: ExamDb,
    subjects: SubjectRepository,
    topics: TopicRepository,
    questions: QuestionRepository,
    tests: TestRepository,
    order: SelectionOrder,
    default_question_count: u32,
}

impl TestAssembler {
    #[must_use]
    pub fn new(db: ExamDb) -> Self {
        Self {
            subjects: SubjectRepository::with_db(db.clone()),
            topics: TopicRepository::with_db(db.clone()),
            questions: QuestionRepository::new(db.clone()),
            tests: TestRepository::with_db(db.clone()),
            db,
            order: SelectionOrder::Sequential,
            default_question_count: DEFAULT_QUESTION_COUNT,
        }
    }

    /// Assembler using the `[generation]` settings.
    #[must_use]
    pub fn with_config(db: ExamDb, config: &GenerationConfig) -> Self {
        Self {
            order: SelectionOrder::from_config(config),
            default_question_count: config.default_question_count,
            ..Self::new(db)
        }
    }

    #[must_use]
    pub const fn with_order(mut self, order: SelectionOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn order(&self) -> SelectionOrder {
        self.order
    }

    /// Generate and store a test.
    ///
    /// Returns the stored test with its question snapshot; every question in
    /// it is now flagged used.
    ///
    /// # Errors
    ///
    /// - `Validation` for an unusable request: empty title, zero count, a
    ///   comprehensive request naming a topic, an unknown subject, or a
    ///   topic outside the subject.
    /// - `InsufficientQuestions` when fewer than `n` unused questions are
    ///   eligible. Nothing is written.
    /// - `Persistence` when the store fails; all writes are rolled back.
    pub async fn generate(&self, request: &TestRequest) -> Result<Test, DatabaseError> {
        let count = request.question_count.unwrap_or(self.default_question_count);
        let mut test = Test::new(
            request.title.clone(),
            request.subject_id,
            request.topic_id,
            count,
            request.comprehensive,
            Utc::now(),
        );
        test.validate()?;

        let conn = self.db.connect().await?;
        self.check_scope(&conn, request).await?;

        let tx = conn.transaction().await?;
        let result = self.assemble(&tx, &mut test).await;
        commit_or_rollback(tx, result).await?;

        info!(
            test_id = test.id,
            subject_id = test.subject_id,
            topic_id = ?test.topic_id,
            questions = test.questions.len(),
            comprehensive = test.comprehensive,
            "test generated"
        );
        Ok(test)
    }

    async fn check_scope(
        &self,
        conn: &libsql::Connection,
        request: &TestRequest,
    ) -> Result<(), DatabaseError> {
        if !self
            .subjects
            .exists_id_with_conn(conn, request.subject_id)
            .await?
        {
            return Err(DatabaseError::Validation(format!(
                "subject {} does not exist",
                request.subject_id
            )));
        }

        if let Some(topic_id) = request.topic_id {
            match self.topics.select_by_id_with_conn(conn, topic_id).await? {
                None => {
                    return Err(DatabaseError::Validation(format!(
                        "topic {topic_id} does not exist"
                    )));
                }
                Some(topic) if topic.subject_id != request.subject_id => {
                    return Err(DatabaseError::Validation(format!(
                        "topic {topic_id} belongs to subject {}, not {}",
                        topic.subject_id, request.subject_id
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn assemble(
        &self,
        conn: &libsql::Connection,
        test: &mut Test,
    ) -> Result<(), DatabaseError> {
        let pool = self
            .questions
            .select_unused_with_conn(conn, test.subject_id, test.topic_id)
            .await?;

        let requested = test.question_count as usize;
        if pool.len() < requested {
            warn!(
                subject_id = test.subject_id,
                topic_id = ?test.topic_id,
                requested,
                available = pool.len(),
                "not enough unused questions"
            );
            return Err(DatabaseError::InsufficientQuestions {
                requested,
                available: pool.len(),
            });
        }

        let mut selected = select_questions(pool, requested, test.comprehensive, self.order);
        for question in &mut selected {
            self.questions.mark_used_with_conn(conn, question.id).await?;
            question.used = true;
        }
        test.questions = selected;

        self.tests.insert_with_conn(conn, test).await
    }
}

/// Pick `n` questions from `pool` without replacement.
///
/// Returns fewer than `n` only when the pool is smaller than `n`.
#[must_use]
pub fn select_questions(
    mut pool: Vec<Question>,
    n: usize,
    comprehensive: bool,
    order: SelectionOrder,
) -> Vec<Question> {
    pool.sort_by_key(|q| q.id);
    let mut rng = match order {
        SelectionOrder::Sequential => None,
        SelectionOrder::Shuffled { seed } => Some(StdRng::seed_from_u64(seed)),
    };

    if !comprehensive {
        if let Some(rng) = rng.as_mut() {
            pool.shuffle(rng);
        }
        pool.truncate(n);
        return pool;
    }

    let mut by_topic: BTreeMap<i64, Vec<Question>> = BTreeMap::new();
    for question in pool {
        by_topic.entry(question.topic_id).or_default().push(question);
    }
    let mut groups: Vec<VecDeque<Question>> = by_topic
        .into_values()
        .map(|mut group| {
            if let Some(rng) = rng.as_mut() {
                group.shuffle(rng);
            }
            VecDeque::from(group)
        })
        .collect();

    let mut selected = Vec::with_capacity(n);
    while selected.len() < n {
        let before = selected.len();
        for group in &mut groups {
            if selected.len() == n {
                break;
            }
            if let Some(question) = group.pop_front() {
                selected.push(question);
            }
        }
        if selected.len() == before {
            break;
        }
    }
    selected
}
