//! # Event Bus Ports
//!
//! Publish/subscribe contract for session events, modeled on the upstream
//! Redis pub/sub bridge: a [`EventPublisher`] pushes [`SessionEvent`]s onto a
//! per-session channel, and an [`EventSubscriber`] yields them back out as an
//! async stream for the Event Stream Gateway to bridge to SSE.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::PipelineError;
use crate::events::SessionEvent;
use crate::value_objects::SessionId;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event on `session_id`'s channel. Returns whether at
    /// least one subscriber received it (the broadcast-gate invariant,
    /// spec.md §4.2, needs this signal to decide whether to fan out).
    async fn publish(&self, session_id: &SessionId, event: &SessionEvent) -> Result<bool, PipelineError>;
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribes to `session_id`'s channel and returns a live stream of
    /// events published on it from this point forward. Does not replay
    /// history; the gateway is responsible for history replay from the
    /// Session Store before attaching this stream.
    async fn subscribe(&self, session_id: &SessionId) -> Result<BoxStream<'static, SessionEvent>, PipelineError>;
}
