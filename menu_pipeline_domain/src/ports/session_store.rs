//! # Session Store Port
//!
//! Persistence contract for session rows. Implementations own the status
//! lifecycle, the per-stage results blob, and the item identifier list;
//! the application layer never touches storage directly.

use async_trait::async_trait;

use crate::entities::Session;
use crate::error::PipelineError;
use crate::value_objects::SessionId;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetches a session by id, or `None` if it has never been seen.
    async fn find(&self, id: &SessionId) -> Result<Option<Session>, PipelineError>;

    /// Inserts a brand-new session or overwrites an existing one wholesale.
    /// Callers are responsible for the duplicate-submission guard (invariant
    /// 6) before calling this with an overwrite.
    async fn upsert(&self, session: &Session) -> Result<(), PipelineError>;

    /// Merges `payload` into the session's stages blob under `stage_name`
    /// and advances `current_stage`, persisting the result.
    async fn update_stage(&self, id: &SessionId, stage_name: &str, payload: serde_json::Value) -> Result<(), PipelineError>;

    /// Appends to the session's item identifier list (monotonic growth,
    /// invariant 1).
    async fn append_item_ids(&self, id: &SessionId, item_ids: &[crate::value_objects::ItemId]) -> Result<(), PipelineError>;

    /// Sets the terminal or in-flight status directly.
    async fn set_status(&self, id: &SessionId, status: crate::entities::SessionStatus) -> Result<(), PipelineError>;
}
