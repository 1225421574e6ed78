use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Entity, Question, check_text};
use crate::UNASSIGNED_ID;
use crate::enums::GradeLevel;
use crate::errors::CoreError;

/// Maximum length of a topic name, in characters.
pub const TOPIC_NAME_MAX: usize = 100;

/// A graded sub-unit of a subject. Owns its questions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub grade: GradeLevel,
    pub subject_id: i64,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Topic {
    #[must_use]
    pub fn new(name: impl Into<String>, grade: GradeLevel, subject_id: i64) -> Self {
        Self {
            id: UNASSIGNED_ID,
            name: name.into(),
            grade,
            subject_id,
            questions: Vec::new(),
        }
    }

    /// Append a question. Equal statements are allowed.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Questions that have not been drawn into a test yet.
    pub fn unused_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| !q.used)
    }
}

impl Entity for Topic {
    const ENTITY_TYPE: &'static str = "topic";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn update_from(&mut self, source: &Self) {
        self.name.clone_from(&source.name);
        self.grade = source.grade;
        self.subject_id = source.subject_id;
        self.questions.clone_from(&source.questions);
    }

    fn validate(&self) -> Result<(), CoreError> {
        check_text("topic name", &self.name, TOPIC_NAME_MAX)
    }
}
