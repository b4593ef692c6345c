//! # Session Events
//!
//! The wire format every event published on a session's channel takes,
//! grounded on the upstream domain's `GenericEvent` envelope pattern: a
//! stable envelope (`type`, `session_id`, `timestamp`) wrapping a
//! payload whose shape varies per message type. Rust gives us the choice
//! between one big tagged enum and an envelope-plus-`Value` pair; this
//! domain picks the latter because the nine message types in spec.md §4.5
//! are themselves loosely structured (`stage_completed`'s `completion_data`
//! is stage-specific, `<task>_batch_completed`'s `processing_summary` is
//! task-specific) — exactly the "dynamic payload shapes" case flagged in
//! spec.md §9's mapping strategies. Each well-known message type still gets
//! a typed constructor so call sites can't typo a field name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::value_objects::SessionId;

/// An event published on a session's channel. Every event carries the
/// session identifier and a type tag drawn from a fixed enumeration
/// (invariant 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub session_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(session_id: &SessionId, kind: impl Into<String>, data: Value) -> Self {
        Self { kind: kind.into(), session_id: session_id.as_str().to_string(), data, timestamp: Utc::now() }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// `stage_completed` — `{ stage, completion_data, ui_action }`.
    pub fn stage_completed(session_id: &SessionId, stage: &str, completion_data: Value, is_history: bool) -> Self {
        let mut data = json!({
            "stage": stage,
            "completion_data": completion_data,
            "ui_action": format!("update_{stage}_display"),
        });
        if is_history {
            data["is_history"] = json!(true);
        }
        Self::new(session_id, "stage_completed", data)
    }

    /// `progress_update` — `{ task_name, status, progress_data }`.
    pub fn progress_update(session_id: &SessionId, task_name: &str, status: &str, progress_data: Value, is_history: bool) -> Self {
        let mut data = json!({
            "task_name": task_name,
            "status": status,
            "progress_data": progress_data,
        });
        if is_history {
            data["is_history"] = json!(true);
        }
        Self::new(session_id, "progress_update", data)
    }

    /// `menu_update` — `{ menu_id, menu_data }`.
    pub fn menu_update(session_id: &SessionId, menu_id: &str, menu_data: Value) -> Self {
        Self::new(session_id, "menu_update", json!({ "menu_id": menu_id, "menu_data": menu_data }))
    }

    /// `error` — `{ error_type, error_message, task_name? }`.
    pub fn error(session_id: &SessionId, error_type: &str, error_message: &str, task_name: Option<&str>) -> Self {
        let mut data = json!({ "error_type": error_type, "error_message": error_message });
        if let Some(task_name) = task_name {
            data["task_name"] = json!(task_name);
        }
        Self::new(session_id, "error", data)
    }

    /// `parallel_tasks_started` — `{ parallel_tasks[], task_ids{}, total_items, execution_mode }`.
    pub fn parallel_tasks_started(session_id: &SessionId, parallel_tasks: Vec<&str>, task_ids: Value, total_items: usize) -> Self {
        Self::new(
            session_id,
            "parallel_tasks_started",
            json!({
                "parallel_tasks": parallel_tasks,
                "task_ids": task_ids,
                "total_items": total_items,
                "execution_mode": "fan_out",
            }),
        )
    }

    /// `<task>_batch_completed` — `{ task_type, completed_items, total_items, success_rate, processing_summary }`.
    pub fn batch_completed(
        session_id: &SessionId,
        event_type: &str,
        task_type: &str,
        completed_items: usize,
        total_items: usize,
        success_rate: f64,
        processing_summary: Value,
    ) -> Self {
        Self::new(
            session_id,
            event_type,
            json!({
                "task_type": task_type,
                "completed_items": completed_items,
                "total_items": total_items,
                "success_rate": success_rate,
                "processing_summary": processing_summary,
            }),
        )
    }

    /// `connection_established` — `{ status, connection_id, active_connections }`.
    pub fn connection_established(session_id: &SessionId, connection_id: &str, active_connections: usize) -> Self {
        Self::new(
            session_id,
            "connection_established",
            json!({ "status": "connected", "connection_id": connection_id, "active_connections": active_connections }),
        )
    }

    /// `heartbeat` — `{ uptime, message }`.
    pub fn heartbeat(session_id: &SessionId, uptime_secs: u64) -> Self {
        Self::new(
            session_id,
            "heartbeat",
            json!({ "uptime": uptime_secs, "message": "connection alive" }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_carries_its_session_id() {
        let sid = SessionId::new("session-12345678").unwrap();
        let events = vec![
            SessionEvent::stage_completed(&sid, "ocr", json!({}), false),
            SessionEvent::error(&sid, "boom", "msg", None),
            SessionEvent::heartbeat(&sid, 42),
        ];
        for e in events {
            assert_eq!(e.session_id, sid.as_str());
        }
    }

    #[test]
    fn round_trips_through_json() {
        let sid = SessionId::new("session-12345678").unwrap();
        let e = SessionEvent::menu_update(&sid, "item-1", json!({"translation": "Sushi"}));
        let raw = e.to_json().unwrap();
        let back = SessionEvent::from_json(&raw).unwrap();
        assert_eq!(back.kind, "menu_update");
        assert_eq!(back.session_id, sid.as_str());
    }

    #[test]
    fn history_events_are_marked() {
        let sid = SessionId::new("session-12345678").unwrap();
        let e = SessionEvent::stage_completed(&sid, "ocr", json!({}), true);
        assert_eq!(e.data["is_history"], json!(true));
    }
}
