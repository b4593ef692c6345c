//! # Pipeline Coordinator
//!
//! Orchestrates one menu image through its three sequential stages — text
//! extraction, spatial formatting, structural categorization — then gates
//! the five-way enrichment fan-out on whether stage 3's completion
//! broadcast actually reached a subscriber. Grounded on the upstream
//! `PipelineCoordinator.process_menu_image` control flow: duplicate-
//! submission guard, per-stage execute/persist/broadcast cycle,
//! broadcast-gated fan-out, and terminal status handling.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use menu_pipeline_domain::entities::{Session, SessionStatus, STAGE_CATEGORIZE, STAGE_MAPPING, STAGE_OCR};
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{CategorizeProvider, EventPublisher, ItemStore, OcrProvider, OcrTextBox, SessionStore};
use menu_pipeline_domain::value_objects::{ItemId, SessionId};
use menu_pipeline_domain::MenuItem;

use crate::application::batch_executor::EnrichmentDispatcher;

/// The granularity passed to the OCR and categorization providers. Fixed
/// per spec.md §4.1 rather than configurable — the three stages have no
/// caller-visible tuning surface of their own.
const GRANULARITY: &str = "paragraph";

/// Vertical tolerance, in the OCR provider's coordinate units, for two text
/// records to be considered part of the same menu row (spec.md §4.1 stage 2).
const ROW_TOLERANCE: f64 = 20.0;

/// Everything the coordinator needs to drive one session end to end.
pub struct PipelineCoordinator {
    session_store: Arc<dyn SessionStore>,
    item_store: Arc<dyn ItemStore>,
    publisher: Arc<dyn EventPublisher>,
    ocr_provider: Arc<dyn OcrProvider>,
    categorize_provider: Arc<dyn CategorizeProvider>,
    dispatcher: Arc<EnrichmentDispatcher>,
}

impl PipelineCoordinator {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        item_store: Arc<dyn ItemStore>,
        publisher: Arc<dyn EventPublisher>,
        ocr_provider: Arc<dyn OcrProvider>,
        categorize_provider: Arc<dyn CategorizeProvider>,
        dispatcher: Arc<EnrichmentDispatcher>,
    ) -> Self {
        Self { session_store, item_store, publisher, ocr_provider, categorize_provider, dispatcher }
    }

    /// Processes one uploaded menu image through the full pipeline.
    ///
    /// Returns `Ok(())` once the session has reached a terminal status
    /// (`COMPLETED` or `FAILED`) — both are considered a successful return
    /// from this method's point of view; only guard rejections and
    /// infrastructure failures surface as `Err`.
    #[instrument(skip(self, image_bytes), fields(session_id = %session_id))]
    pub async fn process_menu_image(&self, session_id: SessionId, image_bytes: Vec<u8>) -> Result<(), PipelineError> {
        if image_bytes.is_empty() {
            return Err(PipelineError::invalid_input("image bytes must not be empty"));
        }

        let mut session = self.admit_session(&session_id).await?;

        if let Err(err) = self.run_stages(&mut session, &image_bytes).await {
            warn!(error = %err, "pipeline stage failed, marking session FAILED");
            self.fail_session(&session_id, &err).await;
            return Ok(());
        }

        session.transition_to(SessionStatus::Completed)?;
        self.session_store.set_status(&session_id, SessionStatus::Completed).await?;
        info!("session completed");
        Ok(())
    }

    /// The duplicate-submission guard (invariant 6): PROCESSING is rejected
    /// outright, COMPLETED is rejected outright, FAILED or PENDING (or
    /// never-seen) is accepted and `created_at` is preserved across the
    /// restart.
    async fn admit_session(&self, session_id: &SessionId) -> Result<Session, PipelineError> {
        match self.session_store.find(session_id).await? {
            Some(existing) if existing.status() == SessionStatus::Processing => {
                Err(PipelineError::DuplicateProcessing(session_id.to_string()))
            }
            Some(existing) if existing.status() == SessionStatus::Completed => {
                Err(PipelineError::AlreadyCompleted(session_id.to_string()))
            }
            Some(mut existing) => {
                existing.restart_for_reprocessing();
                self.session_store.upsert(&existing).await?;
                Ok(existing)
            }
            None => {
                let mut session = Session::new(session_id.clone());
                session.transition_to(SessionStatus::Processing)?;
                self.session_store.upsert(&session).await?;
                Ok(session)
            }
        }
    }

    async fn run_stages(&self, session: &mut Session, image_bytes: &[u8]) -> Result<(), PipelineError> {
        // Stage 1 — text extraction.
        self.publish_progress(session.id(), STAGE_OCR, 0).await;
        let text_boxes = self
            .ocr_provider
            .extract_text(image_bytes, GRANULARITY)
            .await
            .map_err(|e| PipelineError::stage_failed(STAGE_OCR, e.to_string()))?;
        let stage1_payload = serde_json::json!({
            "text_boxes": text_boxes,
            "count": text_boxes.len(),
            "density": density_category(text_boxes.len()),
        });
        self.complete_stage(session, STAGE_OCR, stage1_payload).await?;

        // Stage 2 — spatial formatting. Pure geometry; no provider call.
        self.publish_progress(session.id(), STAGE_MAPPING, 33).await;
        let formatted_text = format_menu_layout(&text_boxes);
        self.complete_stage(session, STAGE_MAPPING, serde_json::json!({ "formatted_text": formatted_text })).await?;

        // Stage 3 — structural categorization.
        self.publish_progress(session.id(), STAGE_CATEGORIZE, 66).await;
        let categorized = self
            .categorize_provider
            .categorize(&formatted_text, GRANULARITY)
            .await
            .map_err(|e| PipelineError::stage_failed(STAGE_CATEGORIZE, e.to_string()))?;

        let items = dedup_categorized(session.id().clone(), categorized);

        // Items must be durably visible before the stage_completed broadcast
        // goes out below — a successful broadcast is a post-commit
        // acknowledgement (spec.md §4.1/§9), so persistence happens first.
        let item_ids: Vec<ItemId> = items.iter().map(|i| i.id().clone()).collect();
        if !items.is_empty() {
            self.item_store.bulk_insert(&items).await?;
            self.session_store.append_item_ids(session.id(), &item_ids).await?;
            session.add_item_ids(item_ids.clone());
        }

        let broadcast_ok =
            self.complete_stage(session, STAGE_CATEGORIZE, serde_json::json!({ "item_count": items.len() })).await?;

        // Broadcast gate (spec.md §4.2): fan-out proceeds only if the
        // stage_completed broadcast reached someone AND at least one item
        // exists. Otherwise we publish a dedicated error event but still
        // let the session reach COMPLETED below — enrichment is best-effort,
        // not part of the pipeline's own success criterion.
        if broadcast_ok && !items.is_empty() {
            self.dispatcher.dispatch(session.id().clone(), item_ids).await;
        } else if !broadcast_ok {
            let event = SessionEvent::error(
                session.id(),
                "sse_broadcast_failed",
                "stage_completed broadcast reached no subscriber; enrichment fan-out skipped",
                None,
            );
            let _ = self.publisher.publish(session.id(), &event).await;
        }

        Ok(())
    }

    /// Publishes the `progress_update` event that opens each stage (spec.md
    /// §4.1's (a) step), ahead of the provider call.
    async fn publish_progress(&self, session_id: &SessionId, stage: &str, percent: u8) {
        let event = SessionEvent::progress_update(
            session_id,
            stage,
            "started",
            serde_json::json!({ "stage": stage, "percent": percent }),
            false,
        );
        let _ = self.publisher.publish(session_id, &event).await;
    }

    /// Persists a stage's result, advances `current_stage`, and broadcasts
    /// a `stage_completed` event. Returns whether the broadcast reached a
    /// subscriber.
    async fn complete_stage(&self, session: &mut Session, stage: &str, payload: serde_json::Value) -> Result<bool, PipelineError> {
        session.record_stage(stage, payload.clone());
        self.session_store.update_stage(session.id(), stage, payload.clone()).await?;
        let event = SessionEvent::stage_completed(session.id(), stage, payload, false);
        self.publisher.publish(session.id(), &event).await
    }

    async fn fail_session(&self, session_id: &SessionId, err: &PipelineError) {
        let _ = self.session_store.set_status(session_id, SessionStatus::Failed).await;
        let event = SessionEvent::error(session_id, err.category(), &err.to_string(), None);
        let _ = self.publisher.publish(session_id, &event).await;
    }
}

/// `high` above 20 text records, `medium` above 10, else `low` — spec.md
/// §4.1 stage 1's density classification, used downstream as a rough signal
/// of how crowded the source menu photo was.
fn density_category(count: usize) -> &'static str {
    if count > 20 {
        "high"
    } else if count > 10 {
        "medium"
    } else {
        "low"
    }
}

/// Groups OCR records by `y_center` within [`ROW_TOLERANCE`], sorts each
/// group by `x_center`, and renders the deterministic listing spec.md
/// §4.1 stage 2 describes: a header with totals, one summary line per row,
/// then the raw coordinate-sorted listing stage 3 consumes as plain text.
///
/// Grouping is a single left-to-right sweep over records sorted by `y`: a
/// record opens a new row unless it falls within tolerance of the row
/// currently being built. This is the simplest clustering that satisfies
/// the "±20 units" tolerance the spec gives without requiring a second
/// pass to merge transitively-close rows.
fn format_menu_layout(text_boxes: &[OcrTextBox]) -> String {
    let mut sorted: Vec<&OcrTextBox> = text_boxes.iter().collect();
    sorted.sort_by(|a, b| a.y_center.partial_cmp(&b.y_center).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<Vec<&OcrTextBox>> = Vec::new();
    for record in sorted {
        match rows.last_mut() {
            Some(row) if (row[0].y_center - record.y_center).abs() <= ROW_TOLERANCE => row.push(record),
            _ => rows.push(vec![record]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x_center.partial_cmp(&b.x_center).unwrap_or(std::cmp::Ordering::Equal));
    }

    let mut out = String::new();
    out.push_str(&format!("Menu layout: {} text elements across {} rows\n\n", text_boxes.len(), rows.len()));
    for (i, row) in rows.iter().enumerate() {
        let texts: Vec<&str> = row.iter().map(|r| r.text.as_str()).collect();
        out.push_str(&format!("Row {}: {}\n", i + 1, texts.join(" | ")));
    }
    out.push_str("\nRaw listing (by position):\n");
    for row in &rows {
        match row.as_slice() {
            [single] => out.push_str(&format!("- {}\n", single.text)),
            [name, price] => out.push_str(&format!("- {} — {}\n", name.text, price.text)),
            many => out.push_str(&format!("- {}\n", many.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" — "))),
        }
    }
    out
}

/// Drops duplicate (name, category) pairs (invariant 4) and empty names,
/// keeping the first occurrence.
fn dedup_categorized(session_id: SessionId, lines: Vec<menu_pipeline_domain::ports::CategorizedLine>) -> Vec<MenuItem> {
    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();
    for line in lines {
        if line.name.trim().is_empty() {
            continue;
        }
        let key = MenuItem::dedup_key(&line.name, &line.category);
        if seen.insert(key) {
            items.push(MenuItem::new(session_id.clone(), line.name, line.category, line.price));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tb(text: &str, x: f64, y: f64) -> OcrTextBox {
        OcrTextBox { text: text.to_string(), x_center: x, y_center: y }
    }

    #[test]
    fn dedup_categorized_drops_repeat_name_category_pairs_and_empty_names() {
        use menu_pipeline_domain::ports::CategorizedLine;
        let sid = SessionId::new("session-1").unwrap();
        let lines = vec![
            CategorizedLine { name: "Sushi".into(), category: "Mains".into(), price: "¥500".into() },
            CategorizedLine { name: " Sushi ".into(), category: "Mains".into(), price: "¥550".into() },
            CategorizedLine { name: "Ramen".into(), category: "Mains".into(), price: "¥800".into() },
            CategorizedLine { name: "  ".into(), category: "Mains".into(), price: "¥0".into() },
        ];
        let items = dedup_categorized(sid, lines);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn format_menu_layout_groups_rows_within_tolerance_and_sorts_by_x() {
        let boxes = vec![tb("¥500", 120.0, 10.0), tb("Sushi", 0.0, 12.0), tb("Ramen", 0.0, 200.0), tb("¥800", 120.0, 195.0)];
        let formatted = format_menu_layout(&boxes);
        assert!(formatted.contains("4 text elements across 2 rows"));
        assert!(formatted.contains("- Sushi — ¥500"));
        assert!(formatted.contains("- Ramen — ¥800"));
    }

    #[test]
    fn format_menu_layout_handles_zero_records() {
        let formatted = format_menu_layout(&[]);
        assert!(formatted.contains("0 text elements across 0 rows"));
        assert!(formatted.ends_with("Raw listing (by position):\n"));
    }

    #[test]
    fn density_category_boundaries() {
        assert_eq!(density_category(21), "high");
        assert_eq!(density_category(11), "medium");
        assert_eq!(density_category(10), "low");
        assert_eq!(density_category(0), "low");
    }
}
