//! Eager loading of the question bank hierarchy.
//!
//! A tree is fetched with one `LEFT JOIN` query per call, never one query per
//! parent. Rows come back ordered by the id of every joined level, so each
//! parent's children are contiguous and in ascending id order; the fold
//! functions append a new node whenever the id at their level changes.

use examgen_core::entities::{AnswerOption, Question, Subject, Test, Topic};

use crate::error::DatabaseError;
use crate::mappers::{
    AnswerOptionMapper, OPTION_COLUMNS, QUESTION_COLUMNS, QuestionMapper, SUBJECT_COLUMNS,
    SubjectMapper, TEST_COLUMNS, TOPIC_COLUMNS, TestMapper, TopicMapper,
};
use crate::mapping::{ColumnIndex, Command, ResultRow, RowMapper};

/// Which child collections to populate below the root entity.
///
/// A level is loaded only together with every level above it: asking for
/// answer options without questions loads neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub topics: bool,
    pub questions: bool,
    pub answer_options: bool,
}

impl LoadOptions {
    /// Root rows only.
    pub const SHALLOW: Self = Self {
        topics: false,
        questions: false,
        answer_options: false,
    };

    /// The whole tree.
    pub const FULL: Self = Self {
        topics: true,
        questions: true,
        answer_options: true,
    };

    #[must_use]
    pub const fn with_topics(mut self) -> Self {
        self.topics = true;
        self
    }

    #[must_use]
    pub const fn with_questions(mut self) -> Self {
        self.questions = true;
        self
    }

    #[must_use]
    pub const fn with_answer_options(mut self) -> Self {
        self.answer_options = true;
        self
    }

    /// Levels to join below a subject.
    pub(crate) const fn subject_depth(self) -> usize {
        if !self.topics {
            0
        } else if !self.questions {
            1
        } else if !self.answer_options {
            2
        } else {
            3
        }
    }

    /// Levels to join below a topic.
    pub(crate) const fn topic_depth(self) -> usize {
        if !self.questions {
            0
        } else if !self.answer_options {
            1
        } else {
            2
        }
    }
}

/// Entity level of the hierarchy, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Subject = 0,
    Topic = 1,
    Question = 2,
}

struct LevelSql {
    columns: &'static str,
    from: &'static str,
    join: &'static str,
    order: &'static str,
}

const LEVELS: [LevelSql; 4] = [
    LevelSql {
        columns: SUBJECT_COLUMNS,
        from: "subjects s",
        join: "",
        order: "s.id",
    },
    LevelSql {
        columns: TOPIC_COLUMNS,
        from: "topics t",
        join: "LEFT JOIN topics t ON t.subject_id = s.id",
        order: "t.id",
    },
    LevelSql {
        columns: QUESTION_COLUMNS,
        from: "questions q",
        join: "LEFT JOIN questions q ON q.topic_id = t.id",
        order: "q.id",
    },
    LevelSql {
        columns: OPTION_COLUMNS,
        from: "answer_options o",
        join: "LEFT JOIN answer_options o ON o.question_id = q.id",
        order: "o.id",
    },
];

/// Build the tree query rooted at `root`, joining `depth` levels below it.
///
/// `filter` is an SQL condition over the table aliases (`s`, `t`, `q`, `o`).
pub(crate) fn tree_query(root: Level, depth: usize, filter: Option<&str>) -> String {
    let start = root as usize;
    let end = (start + depth).min(LEVELS.len() - 1);
    let levels = &LEVELS[start..=end];

    let columns: Vec<_> = levels.iter().map(|l| l.columns).collect();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), levels[0].from);
    for level in &levels[1..] {
        sql.push(' ');
        sql.push_str(level.join);
    }
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    let order: Vec<_> = levels.iter().map(|l| l.order).collect();
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));
    sql
}

/// Load subjects with `depth` levels of children.
pub(crate) async fn load_subjects(
    conn: &libsql::Connection,
    depth: usize,
    filter: Option<&str>,
    command: Command,
) -> Result<Vec<Subject>, DatabaseError> {
    let sql = tree_query(Level::Subject, depth, filter);
    let mut rows = conn.query(&sql, command.into_params()).await?;
    let columns = ColumnIndex::from_rows(&rows);

    let mut subjects: Vec<Subject> = Vec::new();
    while let Some(row) = rows.next().await? {
        let row = ResultRow::new(&row, &columns);
        let id: i64 = row.get(SubjectMapper::ID_COLUMN)?;
        if subjects.last().is_none_or(|s| s.id != id) {
            subjects.push(SubjectMapper.map_row(&row)?);
        }
        if depth > 0 {
            if let Some(subject) = subjects.last_mut() {
                fold_topic(&mut subject.topics, &row, depth - 1)?;
            }
        }
    }
    Ok(subjects)
}

/// Load topics with `depth` levels of children.
pub(crate) async fn load_topics(
    conn: &libsql::Connection,
    depth: usize,
    filter: Option<&str>,
    command: Command,
) -> Result<Vec<Topic>, DatabaseError> {
    let sql = tree_query(Level::Topic, depth, filter);
    let mut rows = conn.query(&sql, command.into_params()).await?;
    let columns = ColumnIndex::from_rows(&rows);

    let mut topics = Vec::new();
    while let Some(row) = rows.next().await? {
        fold_topic(&mut topics, &ResultRow::new(&row, &columns), depth)?;
    }
    Ok(topics)
}

/// Load questions together with their answer options.
pub(crate) async fn load_questions(
    conn: &libsql::Connection,
    filter: Option<&str>,
    command: Command,
) -> Result<Vec<Question>, DatabaseError> {
    let sql = tree_query(Level::Question, 1, filter);
    let mut rows = conn.query(&sql, command.into_params()).await?;
    let columns = ColumnIndex::from_rows(&rows);

    let mut questions = Vec::new();
    while let Some(row) = rows.next().await? {
        fold_question(&mut questions, &ResultRow::new(&row, &columns), 1)?;
    }
    Ok(questions)
}

/// Load one test with its question snapshot, in selection order.
pub(crate) async fn load_test(
    conn: &libsql::Connection,
    test_id: i64,
) -> Result<Option<Test>, DatabaseError> {
    let sql = format!(
        "SELECT {TEST_COLUMNS}, {QUESTION_COLUMNS}, {OPTION_COLUMNS} \
         FROM tests x \
         LEFT JOIN test_questions tq ON tq.test_id = x.id \
         LEFT JOIN questions q ON q.id = tq.question_id \
         LEFT JOIN answer_options o ON o.question_id = q.id \
         WHERE x.id = :id \
         ORDER BY tq.position, o.id"
    );
    let mut rows = conn
        .query(&sql, Command::new().with("id", test_id).into_params())
        .await?;
    let columns = ColumnIndex::from_rows(&rows);

    let mut test: Option<Test> = None;
    while let Some(row) = rows.next().await? {
        let row = ResultRow::new(&row, &columns);
        if test.is_none() {
            test = Some(TestMapper.map_row(&row)?);
        }
        if let Some(test) = test.as_mut() {
            fold_question(&mut test.questions, &row, 1)?;
        }
    }
    Ok(test)
}

fn fold_topic(
    topics: &mut Vec<Topic>,
    row: &ResultRow<'_>,
    depth: usize,
) -> Result<(), DatabaseError> {
    let Some(id) = row.get_opt::<i64>(TopicMapper::ID_COLUMN)? else {
        return Ok(());
    };
    if topics.last().is_none_or(|t| t.id != id) {
        topics.push(TopicMapper.map_row(row)?);
    }
    if depth > 0 {
        if let Some(topic) = topics.last_mut() {
            fold_question(&mut topic.questions, row, depth - 1)?;
        }
    }
    Ok(())
}

fn fold_question(
    questions: &mut Vec<Question>,
    row: &ResultRow<'_>,
    depth: usize,
) -> Result<(), DatabaseError> {
    let Some(id) = row.get_opt::<i64>(QuestionMapper::ID_COLUMN)? else {
        return Ok(());
    };
    if questions.last().is_none_or(|q| q.id != id) {
        questions.push(QuestionMapper.map_row(row)?);
    }
    if depth > 0 {
        if let Some(question) = questions.last_mut() {
            fold_option(&mut question.options, row)?;
        }
    }
    Ok(())
}

fn fold_option(options: &mut Vec<AnswerOption>, row: &ResultRow<'_>) -> Result<(), DatabaseError> {
    if let Some(option) = AnswerOptionMapper.map_optional(row)? {
        options.push(option);
    }
    Ok(())
}
