use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Entity, check_text};
use crate::UNASSIGNED_ID;
use crate::errors::CoreError;

/// Maximum length of an answer text, in characters.
pub const ANSWER_TEXT_MAX: usize = 100;

/// One labelled choice of a question.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: i64,
    pub letter: char,
    pub answer: String,
    pub correct: bool,
    pub question_id: i64,
}

impl AnswerOption {
    /// Build an option for a question that may not be stored yet.
    ///
    /// `question_id` is filled in when the owning question is inserted.
    #[must_use]
    pub fn new(letter: char, answer: impl Into<String>, correct: bool) -> Self {
        Self {
            id: UNASSIGNED_ID,
            letter,
            answer: answer.into(),
            correct,
            question_id: UNASSIGNED_ID,
        }
    }
}

impl Entity for AnswerOption {
    const ENTITY_TYPE: &'static str = "answer_option";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn update_from(&mut self, source: &Self) {
        self.letter = source.letter;
        self.answer.clone_from(&source.answer);
        self.correct = source.correct;
        self.question_id = source.question_id;
    }

    fn validate(&self) -> Result<(), CoreError> {
        if !self.letter.is_alphanumeric() {
            return Err(CoreError::validation(format!(
                "option label must be a letter or digit, got {:?}",
                self.letter
            )));
        }
        check_text("answer text", &self.answer, ANSWER_TEXT_MAX)
    }
}
