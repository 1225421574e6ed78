use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Entity, Question, Topic, check_text};
use crate::UNASSIGNED_ID;
use crate::errors::CoreError;

/// Maximum length of a subject name, in characters.
pub const SUBJECT_NAME_MAX: usize = 100;

/// Top-level curriculum category (e.g. Mathematics) owning its topics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl Subject {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UNASSIGNED_ID,
            name: name.into(),
            topics: Vec::new(),
        }
    }

    /// Append a topic unless an equal one is already present.
    ///
    /// Returns `false` when the topic was a duplicate and nothing changed.
    pub fn add_topic(&mut self, topic: Topic) -> bool {
        if self.topics.contains(&topic) {
            return false;
        }
        self.topics.push(topic);
        true
    }

    /// Every question of every topic, in topic order then question order.
    #[must_use]
    pub fn all_questions(&self) -> Vec<&Question> {
        self.topics
            .iter()
            .flat_map(|topic| topic.questions.iter())
            .collect()
    }
}

impl Entity for Subject {
    const ENTITY_TYPE: &'static str = "subject";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn update_from(&mut self, source: &Self) {
        self.name.clone_from(&source.name);
        self.topics.clone_from(&source.topics);
    }

    fn validate(&self) -> Result<(), CoreError> {
        check_text("subject name", &self.name, SUBJECT_NAME_MAX)
    }
}
