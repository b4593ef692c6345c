//! # Redis Event Bus
//!
//! [`EventPublisher`] and [`EventSubscriber`] over Redis pub/sub, grounded
//! on the upstream `RedisPublisher`/`RedisSubscriber`: one channel per
//! session (`sse:<session_id>`), JSON-encoded [`SessionEvent`] payloads, and
//! `publish()`'s return value used directly as the broadcast-gate signal
//! (Redis `PUBLISH` replies with the receiver count).

use async_trait::async_trait;
use futures::stream::BoxStream;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio_stream::StreamExt;
use tracing::debug;

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{EventPublisher, EventSubscriber};
use menu_pipeline_domain::value_objects::SessionId;

fn channel_for(session_id: &SessionId) -> String {
    format!("sse:{}", session_id.as_str())
}

#[derive(Clone)]
pub struct RedisEventBus {
    client: redis::Client,
    publish_conn: ConnectionManager,
}

impl RedisEventBus {
    pub async fn connect(redis_url: &str) -> Result<Self, PipelineError> {
        let client = redis::Client::open(redis_url).map_err(|e| PipelineError::store_error(e.to_string()))?;
        let publish_conn =
            ConnectionManager::new(client.clone()).await.map_err(|e| PipelineError::store_error(e.to_string()))?;
        Ok(Self { client, publish_conn })
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, session_id: &SessionId, event: &SessionEvent) -> Result<bool, PipelineError> {
        let payload = event.to_json()?;
        let mut conn = self.publish_conn.clone();
        let receivers: i64 = conn
            .publish(channel_for(session_id), payload)
            .await
            .map_err(|e| PipelineError::BroadcastFailed(e.to_string()))?;
        debug!(session_id = %session_id, event = %event.kind, receivers, "published session event");
        Ok(receivers > 0)
    }
}

#[async_trait]
impl EventSubscriber for RedisEventBus {
    async fn subscribe(&self, session_id: &SessionId) -> Result<BoxStream<'static, SessionEvent>, PipelineError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| PipelineError::store_error(e.to_string()))?;
        pubsub.subscribe(channel_for(session_id)).await.map_err(|e| PipelineError::store_error(e.to_string()))?;

        let stream = pubsub.into_on_message().filter_map(|msg| {
            let raw: String = msg.get_payload().ok()?;
            SessionEvent::from_json(&raw).ok()
        });
        Ok(Box::pin(stream))
    }
}
