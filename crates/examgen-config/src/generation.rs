//! Test generation configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default number of questions when a caller does not ask for one.
const fn default_question_count() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Shuffle eligible questions instead of drawing them in id order.
    #[serde(default)]
    pub shuffle: bool,

    /// Seed for the shuffle. Required when `shuffle` is on so draws repeat.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Question count used when a request leaves it unset.
    #[serde(default = "default_question_count")]
    pub default_question_count: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            seed: None,
            default_question_count: default_question_count(),
        }
    }
}

impl GenerationConfig {
    /// Check the values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if shuffling has no seed or the
    /// default count is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shuffle && self.seed.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "generation.seed".into(),
                reason: "required when generation.shuffle is enabled".into(),
            });
        }
        if self.default_question_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.default_question_count".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
