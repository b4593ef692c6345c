//! # In-Memory Event Bus
//!
//! A single-process stand-in for [`RedisEventBus`](super::redis_bus::RedisEventBus),
//! used by tests and by `config check`. Backed by one
//! [`tokio::sync::broadcast`] channel per session rather than Redis
//! pub/sub, so `publish` can report the exact subscriber count without a
//! round trip.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{EventPublisher, EventSubscriber};
use menu_pipeline_domain::value_objects::SessionId;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct InMemoryEventBus {
    channels: Mutex<HashMap<String, broadcast::Sender<SessionEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, session_id: &SessionId) -> broadcast::Sender<SessionEvent> {
        let mut channels = self.channels.lock();
        channels
            .entry(session_id.as_str().to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, session_id: &SessionId, event: &SessionEvent) -> Result<bool, PipelineError> {
        let sender = self.sender_for(session_id);
        let receivers = sender.send(event.clone()).unwrap_or(0);
        Ok(receivers > 0)
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventBus {
    async fn subscribe(&self, session_id: &SessionId) -> Result<BoxStream<'static, SessionEvent>, PipelineError> {
        let receiver = self.sender_for(session_id).subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|r| r.ok());
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_before_any_subscriber_reports_zero_receivers() {
        let bus = InMemoryEventBus::new();
        let sid = SessionId::new("session-1").unwrap();
        let event = SessionEvent::heartbeat(&sid, 1);
        assert!(!bus.publish(&sid, &event).await.unwrap());
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = InMemoryEventBus::new();
        let sid = SessionId::new("session-1").unwrap();
        let mut stream = bus.subscribe(&sid).await.unwrap();

        let event = SessionEvent::heartbeat(&sid, 2);
        assert!(bus.publish(&sid, &event).await.unwrap());

        let received = stream.next().await.unwrap();
        assert_eq!(received.kind, "heartbeat");
    }
}
