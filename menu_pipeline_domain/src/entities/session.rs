//! # Session Entity
//!
//! A session represents one pipeline execution for one uploaded menu image.
//! It is the aggregate root the Pipeline Coordinator mutates at each stage
//! boundary; the Session Store owns its persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::value_objects::{ItemId, SessionId};

/// Canonical stage names, in the order the frontend pipeline completes them.
pub const STAGE_OCR: &str = "ocr";
pub const STAGE_MAPPING: &str = "mapping";
pub const STAGE_CATEGORIZE: &str = "categorize";

/// All stage names in canonical replay order.
pub const CANONICAL_STAGE_ORDER: [&str; 3] = [STAGE_OCR, STAGE_MAPPING, STAGE_CATEGORIZE];

/// The session status lifecycle. Transitions are one-directional:
/// `Pending -> Processing -> (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Whether `self -> next` is a legal transition under the lifecycle
    /// invariant (spec.md invariant 6: PENDING -> PROCESSING -> (COMPLETED |
    /// FAILED), no backward transitions).
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Processing)
                | (Pending, Pending)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

/// One pipeline execution for one uploaded menu image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    status: SessionStatus,
    current_stage: String,
    /// Per-stage structured result, preserved for history replay.
    stages: HashMap<String, serde_json::Value>,
    item_ids: Vec<ItemId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a brand-new session in `PENDING` status with `initialized`
    /// as its current stage, as the Coordinator does on first sight of a
    /// session identifier.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: SessionStatus::Pending,
            current_stage: "initialized".to_string(),
            stages: HashMap::new(),
            item_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_stage(&self) -> &str {
        &self.current_stage
    }

    pub fn stage_result(&self, stage: &str) -> Option<&serde_json::Value> {
        self.stages.get(stage)
    }

    pub fn stages(&self) -> &HashMap<String, serde_json::Value> {
        &self.stages
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Resets a previously FAILED or PENDING session for reprocessing,
    /// preserving `created_at` (the duplicate-submission guard's
    /// overwrite-and-proceed branch).
    pub fn restart_for_reprocessing(&mut self) {
        self.status = SessionStatus::Processing;
        self.current_stage = "initialized".to_string();
        self.stages.clear();
        self.item_ids.clear();
        self.updated_at = Utc::now();
    }

    /// Transitions status, enforcing the lifecycle invariant.
    pub fn transition_to(&mut self, next: SessionStatus) -> Result<(), PipelineError> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::internal_error(format!(
                "illegal session status transition {:?} -> {:?} for session {}",
                self.status, next, self.id
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merges `payload` into the stages blob under `stage_name` and
    /// advances `current_stage`, per `SessionStore::update_stage`.
    pub fn record_stage(&mut self, stage_name: impl Into<String>, payload: serde_json::Value) {
        let stage_name = stage_name.into();
        self.stages.insert(stage_name.clone(), payload);
        self.current_stage = format!("{}_completed", stage_name);
        self.updated_at = Utc::now();
    }

    /// Grows the item identifier list; never rewrites it (invariant 1).
    pub fn add_item_ids(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.item_ids.extend(ids);
        self.updated_at = Utc::now();
    }

    /// Stage names that have a recorded result, in canonical replay order.
    pub fn completed_canonical_stages(&self) -> Vec<&'static str> {
        CANONICAL_STAGE_ORDER.iter().copied().filter(|s| self.stages.contains_key(*s)).collect()
    }
}
