//! End-to-end coverage of `PipelineCoordinator` + `EnrichmentDispatcher`
//! wired against the in-memory bus, lock, and stores — the Concrete
//! Scenarios spec.md §8 lays out, minus the ones that need a live HTTP
//! front end (the SSE gateway itself has its own unit tests).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use menu_pipeline::application::{BatchConfig, EnrichmentDispatcher, EnrichmentProviders, PipelineCoordinator};
use menu_pipeline::infrastructure::{InMemoryDistributedLock, InMemoryEventBus, InMemoryItemStore, InMemorySessionStore};
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{
    AllergenInfo, AllergenProvider, CategorizeProvider, CategorizedLine, DescribeProvider, EventSubscriber, ImageSearchHit,
    ImageSearchProvider, IngredientInfo, IngredientProvider, ItemStore, OcrProvider, OcrTextBox, SessionStore,
    TranslateProvider,
};
use menu_pipeline_domain::value_objects::SessionId;

/// Three menu rows at distinct screen positions, one of them a duplicate
/// (name, category) pair of another — exercises both the spatial grouping
/// in stage 2 and the dedup guard (invariant 4) in stage 3.
struct FakeOcrProvider;

#[async_trait]
impl OcrProvider for FakeOcrProvider {
    async fn extract_text(&self, _image_bytes: &[u8], _granularity: &str) -> Result<Vec<OcrTextBox>, PipelineError> {
        Ok(vec![
            OcrTextBox { text: "Sushi".into(), x_center: 0.0, y_center: 10.0 },
            OcrTextBox { text: "¥500".into(), x_center: 120.0, y_center: 12.0 },
            OcrTextBox { text: "Ramen".into(), x_center: 0.0, y_center: 200.0 },
            OcrTextBox { text: "¥800".into(), x_center: 120.0, y_center: 198.0 },
            OcrTextBox { text: "Gyoza".into(), x_center: 0.0, y_center: 400.0 },
            OcrTextBox { text: "¥600".into(), x_center: 120.0, y_center: 402.0 },
        ])
    }
}

/// Ignores the formatted text and returns three unique items plus a
/// duplicate of the first, so the full pipeline can be asserted to land on
/// exactly three persisted items.
struct FakeCategorizeProvider;

#[async_trait]
impl CategorizeProvider for FakeCategorizeProvider {
    async fn categorize(&self, _formatted_text: &str, _granularity: &str) -> Result<Vec<CategorizedLine>, PipelineError> {
        Ok(vec![
            CategorizedLine { name: "Sushi".into(), category: "Mains".into(), price: "¥500".into() },
            CategorizedLine { name: "Ramen".into(), category: "Mains".into(), price: "¥800".into() },
            CategorizedLine { name: "Gyoza".into(), category: "Appetizers".into(), price: "¥600".into() },
            CategorizedLine { name: " Sushi ".into(), category: "Mains".into(), price: "¥500".into() },
        ])
    }
}

struct FakeTranslateProvider;

#[async_trait]
impl TranslateProvider for FakeTranslateProvider {
    async fn translate(&self, name: &str, category: &str) -> Result<(String, String), PipelineError> {
        Ok((format!("{name} (en)"), format!("{category} (en)")))
    }
}

struct FakeDescribeProvider;

#[async_trait]
impl DescribeProvider for FakeDescribeProvider {
    async fn describe(&self, name: &str, _category: &str) -> Result<String, PipelineError> {
        Ok(format!("{name} is delicious."))
    }
}

struct FakeAllergenProvider;

#[async_trait]
impl AllergenProvider for FakeAllergenProvider {
    async fn extract_allergens(&self, _name: &str, _category: &str) -> Result<AllergenInfo, PipelineError> {
        Ok(AllergenInfo { allergens: vec!["shellfish".into()], allergen_free: false, notes: String::new() })
    }
}

struct FakeIngredientProvider;

#[async_trait]
impl IngredientProvider for FakeIngredientProvider {
    async fn extract_ingredients(&self, _name: &str, _category: &str) -> Result<IngredientInfo, PipelineError> {
        Ok(IngredientInfo { main_ingredients: vec!["rice".into(), "fish".into()], ..Default::default() })
    }
}

struct FakeImageSearchProvider;

#[async_trait]
impl ImageSearchProvider for FakeImageSearchProvider {
    async fn search(&self, _name: &str, _category: &str, _count: usize) -> Result<Vec<ImageSearchHit>, PipelineError> {
        Ok(vec![ImageSearchHit { link: "https://example.test/1".into(), title: "photo".into(), thumbnail: "thumb".into() }])
    }
}

/// A harness bundling the in-memory adapters so each test can build a fresh
/// coordinator and still reach into the stores/bus afterward to assert on
/// outcomes.
struct Harness {
    coordinator: PipelineCoordinator,
    session_store: Arc<InMemorySessionStore>,
    item_store: Arc<InMemoryItemStore>,
    bus: Arc<InMemoryEventBus>,
}

fn build_harness(batch_config: BatchConfig) -> Harness {
    let session_store = Arc::new(InMemorySessionStore::new());
    let item_store = Arc::new(InMemoryItemStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let lock = Arc::new(InMemoryDistributedLock::new());

    let providers = EnrichmentProviders {
        translate: Arc::new(FakeTranslateProvider),
        describe: Arc::new(FakeDescribeProvider),
        allergen: Arc::new(FakeAllergenProvider),
        ingredient: Arc::new(FakeIngredientProvider),
        image_search: Arc::new(FakeImageSearchProvider),
    };

    let dispatcher = Arc::new(EnrichmentDispatcher::new(item_store.clone(), bus.clone(), lock, providers, batch_config));

    let coordinator = PipelineCoordinator::new(
        session_store.clone(),
        item_store.clone(),
        bus.clone(),
        Arc::new(FakeOcrProvider),
        Arc::new(FakeCategorizeProvider),
        dispatcher,
    );

    Harness { coordinator, session_store, item_store, bus }
}

fn fast_batch_config() -> BatchConfig {
    BatchConfig {
        batch_size: 20,
        max_concurrent: 8,
        lock_ttl: Duration::from_secs(10),
        lock_timeout: Duration::from_secs(2),
        lock_retry_delay: Duration::from_millis(10),
        max_retries: 3,
    }
}

/// Spawns a collector that drains `session_id`'s channel into a `Vec`,
/// returning a handle that also keeps the subscription alive — subscribing
/// before the pipeline runs is what makes the broadcast gate (spec.md §4.2)
/// let the fan-out through at all.
async fn collect_events(bus: &InMemoryEventBus, session_id: &SessionId) -> tokio::sync::oneshot::Receiver<Vec<SessionEvent>> {
    let mut stream = bus.subscribe(session_id).await.unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        use futures::StreamExt;
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(500), stream.next()).await {
            events.push(event);
        }
        let _ = tx.send(events);
    });
    rx
}

#[tokio::test]
async fn clean_run_completes_the_session_and_fans_out_all_five_enrichment_tasks() {
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-clean-run-1").unwrap();

    let collector = collect_events(&harness.bus, &session_id).await;

    harness.coordinator.process_menu_image(session_id.clone(), b"fake jpeg bytes".to_vec()).await.unwrap();

    let session = harness.session_store.find(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status(), menu_pipeline_domain::SessionStatus::Completed);
    assert_eq!(session.item_ids().len(), 3, "the duplicate (Sushi, Mains) pair must be dropped");

    let items = harness.item_store.find_by_session(&session_id).await.unwrap();
    assert_eq!(items.len(), 3);
    for item in &items {
        let enrichment = item.enrichment();
        assert!(enrichment.translation.is_some(), "{} missing translation", item.original_text());
        assert!(enrichment.description.is_some(), "{} missing description", item.original_text());
        assert!(enrichment.allergen_text.is_some(), "{} missing allergen text", item.original_text());
        assert!(enrichment.ingredient_text.is_some(), "{} missing ingredient text", item.original_text());
        assert!(enrichment.image_search.is_some(), "{} missing image search", item.original_text());
    }

    let events = collector.await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&"parallel_tasks_started"));
    for task_name in ["translation", "description", "allergen", "ingredient", "search_image"] {
        assert!(kinds.contains(&format!("{task_name}_batch_completed").as_str()), "missing batch_completed for {task_name}");
    }
    let menu_update_count = kinds.iter().filter(|k| **k == "menu_update").count();
    assert_eq!(menu_update_count, 15, "3 items * 5 tasks = 15 menu_update events");
}

#[tokio::test]
async fn duplicate_submission_while_processing_is_rejected_without_new_items() {
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-duplicate-1").unwrap();

    let mut session = menu_pipeline_domain::Session::new(session_id.clone());
    session.transition_to(menu_pipeline_domain::SessionStatus::Processing).unwrap();
    harness.session_store.upsert(&session).await.unwrap();

    let result = harness.coordinator.process_menu_image(session_id.clone(), b"fake jpeg bytes".to_vec()).await;
    assert!(matches!(result, Err(PipelineError::DuplicateProcessing(_))));

    let items = harness.item_store.find_by_session(&session_id).await.unwrap();
    assert!(items.is_empty(), "a rejected duplicate submission must not create items");

    let reloaded = harness.session_store.find(&session_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status(), menu_pipeline_domain::SessionStatus::Processing, "status must not change on rejection");
}

#[tokio::test]
async fn already_completed_session_is_rejected() {
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-completed-1").unwrap();

    let mut session = menu_pipeline_domain::Session::new(session_id.clone());
    session.transition_to(menu_pipeline_domain::SessionStatus::Processing).unwrap();
    session.transition_to(menu_pipeline_domain::SessionStatus::Completed).unwrap();
    harness.session_store.upsert(&session).await.unwrap();

    let result = harness.coordinator.process_menu_image(session_id.clone(), b"fake jpeg bytes".to_vec()).await;
    assert!(matches!(result, Err(PipelineError::AlreadyCompleted(_))));
}

#[tokio::test]
async fn broadcast_failure_skips_fan_out_but_still_completes_the_session() {
    // No subscriber is ever attached to this session's channel, so the
    // categorize stage's `stage_completed` broadcast reaches nobody and the
    // gate (spec.md §4.2) must keep the fan-out from running at all.
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-no-subscriber-1").unwrap();

    harness.coordinator.process_menu_image(session_id.clone(), b"fake jpeg bytes".to_vec()).await.unwrap();

    let session = harness.session_store.find(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status(), menu_pipeline_domain::SessionStatus::Completed);
    assert_eq!(session.item_ids().len(), 3, "items are still persisted even when the fan-out is skipped");

    let items = harness.item_store.find_by_session(&session_id).await.unwrap();
    for item in &items {
        assert!(item.enrichment().translation.is_none(), "no enrichment worker should have run");
    }
}

#[tokio::test]
async fn empty_image_bytes_are_rejected_before_any_stage_runs() {
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-empty-image-1").unwrap();

    let result = harness.coordinator.process_menu_image(session_id.clone(), Vec::new()).await;
    assert!(matches!(result, Err(PipelineError::InvalidInput(_))));

    assert!(harness.session_store.find(&session_id).await.unwrap().is_none(), "no session should be created for a rejected request");
}

#[tokio::test]
async fn restarting_a_failed_session_clears_prior_items_and_stages() {
    let harness = build_harness(fast_batch_config());
    let session_id = SessionId::new("session-restart-1").unwrap();

    let mut failed = menu_pipeline_domain::Session::new(session_id.clone());
    failed.transition_to(menu_pipeline_domain::SessionStatus::Processing).unwrap();
    failed.record_stage(menu_pipeline_domain::entities::STAGE_OCR, serde_json::json!({"count": 1}));
    failed.add_item_ids(vec![menu_pipeline_domain::ItemId::generate()]);
    failed.transition_to(menu_pipeline_domain::SessionStatus::Failed).unwrap();
    harness.session_store.upsert(&failed).await.unwrap();

    let collector = collect_events(&harness.bus, &session_id).await;
    harness.coordinator.process_menu_image(session_id.clone(), b"fake jpeg bytes".to_vec()).await.unwrap();
    drop(collector);

    let session = harness.session_store.find(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status(), menu_pipeline_domain::SessionStatus::Completed);
    assert_eq!(session.item_ids().len(), 3, "restart must not carry over the stale item from the failed run");
}
