//! # Event Stream Gateway
//!
//! Bridges a session's event bus subscription into an SSE-formatted byte
//! stream, grounded on the upstream `SSEConnectionManager`/
//! `create_sse_stream`: a `connection_established` message, then the
//! session's stage history replayed in canonical order (not the bus's own
//! buffered backlog — the bus only carries events published after a client
//! subscribes), then live events forwarded as they arrive, with a 30-second
//! heartbeat so idle HTTP proxies don't close the connection.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use uuid::Uuid;

use menu_pipeline_domain::entities::CANONICAL_STAGE_ORDER;
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{EventSubscriber, SessionStore};
use menu_pipeline_domain::value_objects::SessionId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
pub struct EventStreamGateway {
    active_connections: Arc<AtomicUsize>,
}

impl EventStreamGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Opens an SSE stream for `session_id`: connection banner, history
    /// replay, then live events interleaved with heartbeats. The returned
    /// stream decrements [`Self::active_connections`] when the caller
    /// drops it (client disconnect or request cancellation).
    pub async fn open_stream(
        &self,
        session_id: SessionId,
        session_store: Arc<dyn SessionStore>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Result<BoxStream<'static, String>, PipelineError> {
        if !session_id.meets_gateway_length() {
            return Err(PipelineError::invalid_input("session identifier too short for a stream connection"));
        }

        let live = subscriber.subscribe(&session_id).await?;
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let connection_id = Uuid::new_v4().to_string();
        let banner = SessionEvent::connection_established(&session_id, &connection_id, self.active_connections());
        let history = replay_history(&session_id, &session_store).await?;
        let heartbeats = heartbeat_stream(session_id.clone());

        let events: BoxStream<'static, SessionEvent> =
            Box::pin(stream::once(async move { banner }).chain(stream::iter(history)).chain(live));
        let merged = stream::select(events, heartbeats);
        let guarded = ConnectionGuardedStream { inner: merged, count: Arc::clone(&self.active_connections) };
        Ok(Box::pin(guarded.map(|e| format_sse_message(&e))))
    }
}

async fn replay_history(session_id: &SessionId, session_store: &Arc<dyn SessionStore>) -> Result<Vec<SessionEvent>, PipelineError> {
    let Some(session) = session_store.find(session_id).await? else {
        return Ok(Vec::new());
    };

    let mut history: Vec<SessionEvent> = CANONICAL_STAGE_ORDER
        .iter()
        .filter_map(|stage| session.stage_result(stage).map(|payload| (stage, payload.clone())))
        .map(|(stage, payload)| SessionEvent::stage_completed(session_id, stage, payload, true))
        .collect();

    let completed = session.completed_canonical_stages();
    let percent = (completed.len() * 100) / CANONICAL_STAGE_ORDER.len();
    history.push(SessionEvent::progress_update(
        session_id,
        session.current_stage(),
        &format!("{:?}", session.status()).to_lowercase(),
        serde_json::json!({ "completed_stages": completed, "percent": percent }),
        true,
    ));

    Ok(history)
}

/// An infinite stream of `heartbeat` events, one every [`HEARTBEAT_INTERVAL`].
fn heartbeat_stream(session_id: SessionId) -> BoxStream<'static, SessionEvent> {
    let start = tokio::time::Instant::now();
    Box::pin(async_stream::stream! {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            yield SessionEvent::heartbeat(&session_id, start.elapsed().as_secs());
        }
    })
}

/// Formats one event as an SSE frame: `event: <type>\ndata: <json>\n\n`.
pub fn format_sse_message(event: &SessionEvent) -> String {
    let data = event.to_json().unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event.kind, data)
}

/// Wraps a stream so the shared connection counter is decremented exactly
/// once, whenever this stream is dropped — whether it ran to exhaustion or
/// the client disconnected mid-stream.
struct ConnectionGuardedStream<S> {
    inner: S,
    count: Arc<AtomicUsize>,
}

impl<S: Stream + Unpin> Stream for ConnectionGuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for ConnectionGuardedStream<S> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use menu_pipeline_domain::entities::{Session, SessionStatus, STAGE_CATEGORIZE, STAGE_MAPPING, STAGE_OCR};

    use crate::infrastructure::{InMemoryEventBus, InMemorySessionStore};

    use super::*;

    #[test]
    fn format_sse_message_matches_the_event_stream_wire_format() {
        let sid = SessionId::new("session-1").unwrap();
        let event = SessionEvent::heartbeat(&sid, 5);
        let formatted = format_sse_message(&event);
        assert!(formatted.starts_with("event: heartbeat\ndata: "));
        assert!(formatted.ends_with("\n\n"));
    }

    /// Parses one SSE frame's `event:` line back into a bare type tag, so
    /// tests can assert on the sequence `open_stream` produces without
    /// re-parsing the whole `data:` line for every assertion.
    fn frame_kind(frame: &str) -> &str {
        frame.strip_prefix("event: ").and_then(|rest| rest.split('\n').next()).unwrap()
    }

    fn frame_is_history(frame: &str) -> bool {
        frame.contains("\"is_history\":true")
    }

    async fn next_frame(stream: &mut BoxStream<'static, String>) -> String {
        tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("stream produced no frame within timeout")
            .expect("stream ended early")
    }

    /// Drives `open_stream` end to end against the in-memory adapters,
    /// exercising spec.md §8 Scenario E: a late observer joining after all
    /// three frontend stages completed gets `connection_established`, the
    /// three stages replayed in canonical order and marked `is_history`,
    /// one historical `progress_update`, then live events as they arrive.
    #[tokio::test]
    async fn open_stream_replays_history_before_forwarding_live_events() {
        let session_id = SessionId::new("session-late-observer-1").unwrap();
        let session_store = Arc::new(InMemorySessionStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let mut session = Session::new(session_id.clone());
        session.transition_to(SessionStatus::Processing).unwrap();
        session.record_stage(STAGE_OCR, serde_json::json!({ "count": 2 }));
        session.record_stage(STAGE_MAPPING, serde_json::json!({ "formatted_text": "..." }));
        session.record_stage(STAGE_CATEGORIZE, serde_json::json!({ "item_count": 1 }));
        session.transition_to(SessionStatus::Completed).unwrap();
        session_store.upsert(&session).await.unwrap();

        let gateway = EventStreamGateway::new();
        let mut stream = gateway
            .open_stream(session_id.clone(), session_store.clone(), bus.clone())
            .await
            .unwrap();

        let banner = next_frame(&mut stream).await;
        assert_eq!(frame_kind(&banner), "connection_established");

        for stage in [STAGE_OCR, STAGE_MAPPING, STAGE_CATEGORIZE] {
            let frame = next_frame(&mut stream).await;
            assert_eq!(frame_kind(&frame), "stage_completed");
            assert!(frame_is_history(&frame), "stage {stage} must be marked historical");
            assert!(frame.contains(&format!("\"stage\":\"{stage}\"")));
        }

        let progress = next_frame(&mut stream).await;
        assert_eq!(frame_kind(&progress), "progress_update");
        assert!(frame_is_history(&progress), "the replay summary must be marked historical");

        assert_eq!(gateway.active_connections(), 1);

        let live_event = SessionEvent::menu_update(&session_id, "item-1", serde_json::json!({ "translation": "Sushi" }));
        bus.publish(&session_id, &live_event).await.unwrap();

        let live_frame = next_frame(&mut stream).await;
        assert_eq!(frame_kind(&live_frame), "menu_update");
        assert!(!frame_is_history(&live_frame), "live events must not carry the historical marker");

        drop(stream);
        assert_eq!(gateway.active_connections(), 0, "dropping the stream must release the connection count");
    }

    #[tokio::test]
    async fn open_stream_rejects_a_session_identifier_shorter_than_the_gateway_minimum() {
        let session_id = SessionId::new("short").unwrap();
        let session_store = Arc::new(InMemorySessionStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let gateway = EventStreamGateway::new();
        let result = gateway.open_stream(session_id, session_store, bus).await;
        assert!(result.is_err());
    }
}
