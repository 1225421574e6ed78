//! Entity structs for the question bank.
//!
//! Each entity maps to a table in the libSQL store. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema validation. Equality is by value, child collections included and
//! compared in order.
//!
//! Back-navigation (option → question → topic → subject) is carried as plain
//! foreign-key ids; only the owning direction holds child values.

mod answer_option;
mod question;
mod subject;
mod topic;

pub use answer_option::AnswerOption;
pub use question::{CorrectAnswer, Question};
pub use subject::Subject;
pub use test::Test;
pub use topic::Topic;

use crate::UNASSIGNED_ID;
use crate::errors::CoreError;

/// Capability shared by every stored aggregate.
pub trait Entity: Clone + PartialEq + Send + Sync {
    /// Human-readable type name used in logs and errors.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Copy every mutable field of `source` into `self`. The id is kept.
    fn update_from(&mut self, source: &Self);

    /// Check in-memory invariants before the entity is written.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` describing the first broken invariant.
    fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Whether the store has assigned an id yet.
    fn is_persisted(&self) -> bool {
        self.id() != UNASSIGNED_ID
    }
}

/// Reject empty or over-long text fields.
pub(crate) fn check_text(field: &str, value: &str, max_chars: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(CoreError::validation(format!(
            "{field} is {len} characters, limit is {max_chars}"
        )));
    }
    Ok(())
}
