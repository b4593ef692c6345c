//! In-process stand-ins for [`super::sqlx_stores::SqlxSessionStore`] and
//! [`super::sqlx_stores::SqlxItemStore`], used by tests. A `parking_lot`
//! mutex around a `HashMap` makes every operation trivially atomic, so
//! unlike the Postgres adapter there is no read-modify-write race to guard
//! against here — the whole point of exercising both adapters against the
//! same trait is that callers can't tell the difference.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use menu_pipeline_domain::entities::{Session, SessionStatus};
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::ports::{ItemStore, SessionStore};
use menu_pipeline_domain::value_objects::{ItemId, SessionId};
use menu_pipeline_domain::{EnrichmentUpdate, MenuItem};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find(&self, id: &SessionId) -> Result<Option<Session>, PipelineError> {
        Ok(self.sessions.lock().get(id.as_str()).cloned())
    }

    async fn upsert(&self, session: &Session) -> Result<(), PipelineError> {
        self.sessions.lock().insert(session.id().as_str().to_string(), session.clone());
        Ok(())
    }

    async fn update_stage(&self, id: &SessionId, stage_name: &str, payload: serde_json::Value) -> Result<(), PipelineError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id.as_str()).ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.record_stage(stage_name, payload);
        Ok(())
    }

    async fn append_item_ids(&self, id: &SessionId, item_ids: &[ItemId]) -> Result<(), PipelineError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id.as_str()).ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.add_item_ids(item_ids.iter().cloned());
        Ok(())
    }

    async fn set_status(&self, id: &SessionId, status: SessionStatus) -> Result<(), PipelineError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id.as_str()).ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.transition_to(status)
    }
}

#[derive(Default)]
pub struct InMemoryItemStore {
    items: Mutex<HashMap<String, MenuItem>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn bulk_insert(&self, items: &[MenuItem]) -> Result<(), PipelineError> {
        let mut store = self.items.lock();
        for item in items {
            store.insert(item.id().as_str().to_string(), item.clone());
        }
        Ok(())
    }

    async fn find(&self, id: &ItemId) -> Result<Option<MenuItem>, PipelineError> {
        Ok(self.items.lock().get(id.as_str()).cloned())
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<MenuItem>, PipelineError> {
        Ok(self.items.lock().values().filter(|i| i.session_id() == session_id).cloned().collect())
    }

    async fn apply_enrichment(&self, id: &ItemId, update: EnrichmentUpdate) -> Result<bool, PipelineError> {
        let mut items = self.items.lock();
        match items.get_mut(id.as_str()) {
            Some(item) => {
                item.apply_enrichment(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
