//! # Item Store Port
//!
//! Persistence contract for menu item rows. Distinct from
//! [`crate::ports::SessionStore`] because items are bulk-inserted once by
//! the categorization stage and then independently, partially updated by
//! up to five concurrent enrichment workers per item — a very different
//! access pattern from the session row's single-writer lifecycle.

use async_trait::async_trait;

use crate::entities::{EnrichmentUpdate, MenuItem};
use crate::error::PipelineError;
use crate::value_objects::{ItemId, SessionId};

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts every item atomically; either all rows land or none do.
    /// Stage 3 relies on this to keep `Session::item_ids` and the item
    /// table from diverging if the insert is interrupted midway.
    async fn bulk_insert(&self, items: &[MenuItem]) -> Result<(), PipelineError>;

    async fn find(&self, id: &ItemId) -> Result<Option<MenuItem>, PipelineError>;

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<MenuItem>, PipelineError>;

    /// Applies a partial enrichment update. Soft-fails (returns `Ok` with
    /// no effect when the item no longer exists) rather than erroring, so
    /// a worker's retry loop can keep going (spec.md §4.3 worker retry
    /// contract) instead of treating a vanished row as fatal.
    async fn apply_enrichment(&self, id: &ItemId, update: EnrichmentUpdate) -> Result<bool, PipelineError>;
}
