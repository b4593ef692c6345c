//! # Enrichment Task Kind
//!
//! The five per-item enrichment dimensions. Modeled as a closed enum (rather
//! than a bare `&str`) so queue names, event names, and field routing can
//! never drift out of sync with each other.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Translation,
    Description,
    Allergen,
    Ingredient,
    SearchImage,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] =
        [TaskKind::Translation, TaskKind::Description, TaskKind::Allergen, TaskKind::Ingredient, TaskKind::SearchImage];

    /// The task name used in events and lock keys (`translation`, `description`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Translation => "translation",
            TaskKind::Description => "description",
            TaskKind::Allergen => "allergen",
            TaskKind::Ingredient => "ingredient",
            TaskKind::SearchImage => "search_image",
        }
    }

    /// The bus work queue this task's jobs are enqueued on.
    pub fn queue_name(&self) -> String {
        format!("{}_queue", self.name())
    }

    /// The `<task>_batch_completed` event type this task publishes on completion.
    pub fn batch_completed_event(&self) -> String {
        format!("{}_batch_completed", self.name())
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_and_event_names_follow_convention() {
        assert_eq!(TaskKind::Translation.queue_name(), "translation_queue");
        assert_eq!(TaskKind::SearchImage.batch_completed_event(), "search_image_batch_completed");
    }

    #[test]
    fn all_contains_five_distinct_kinds() {
        let names: std::collections::HashSet<_> = TaskKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), 5);
    }
}
