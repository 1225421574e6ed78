use std::collections::HashSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{AnswerOption, Entity, check_text};
use crate::UNASSIGNED_ID;
use crate::errors::CoreError;

/// Maximum length of a question statement, in characters.
pub const STATEMENT_MAX: usize = 500;

/// A single exam item belonging to a topic.
///
/// `used` flips to `true` once the question is drawn into a generated test
/// and only goes back through an explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub statement: String,
    pub topic_id: i64,
    pub used: bool,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

/// Identity and label of the correct option of a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CorrectAnswer {
    pub id: i64,
    pub letter: char,
}

impl fmt::Display for CorrectAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (option {})", self.letter, self.id)
    }
}

impl Question {
    #[must_use]
    pub fn new(statement: impl Into<String>, topic_id: i64) -> Self {
        Self {
            id: UNASSIGNED_ID,
            statement: statement.into(),
            topic_id,
            used: false,
            options: Vec::new(),
        }
    }

    /// Append an answer option, linking it to this question.
    pub fn add_option(&mut self, mut option: AnswerOption) {
        option.question_id = self.id;
        self.options.push(option);
    }

    /// The option marked correct, if exactly one is.
    #[must_use]
    pub fn correct_option(&self) -> Option<CorrectAnswer> {
        let mut correct = self.options.iter().filter(|o| o.correct);
        match (correct.next(), correct.next()) {
            (Some(option), None) => Some(CorrectAnswer {
                id: option.id,
                letter: option.letter,
            }),
            _ => None,
        }
    }

    /// Point every owned option at `self.id`.
    pub fn link_options(&mut self) {
        let id = self.id;
        for option in &mut self.options {
            option.question_id = id;
        }
    }
}

impl Entity for Question {
    const ENTITY_TYPE: &'static str = "question";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
        self.link_options();
    }

    fn update_from(&mut self, source: &Self) {
        self.statement.clone_from(&source.statement);
        self.topic_id = source.topic_id;
        self.used = source.used;
        self.options.clone_from(&source.options);
        self.link_options();
    }

    fn validate(&self) -> Result<(), CoreError> {
        check_text("question statement", &self.statement, STATEMENT_MAX)?;
        if self.options.is_empty() {
            return Err(CoreError::validation("a question needs at least one option"));
        }

        let correct = self.options.iter().filter(|o| o.correct).count();
        if correct != 1 {
            return Err(CoreError::validation(format!(
                "a question needs exactly one correct option, found {correct}"
            )));
        }

        let mut letters = HashSet::new();
        for option in &self.options {
            option.validate()?;
            if !letters.insert(option.letter.to_ascii_lowercase()) {
                return Err(CoreError::validation(format!(
                    "option label {:?} appears more than once",
                    option.letter
                )));
            }
        }
        Ok(())
    }
}
