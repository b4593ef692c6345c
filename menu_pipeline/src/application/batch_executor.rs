//! # Enrichment Dispatcher and Batch Executor
//!
//! Fans a completed categorization stage out across five independent
//! enrichment dimensions (translation, description, allergen, ingredient,
//! search image), each processed as its own bounded-concurrency batch run.
//! Grounded on the upstream `BatchExecutor`/`BatchConfig` (per-task-kind
//! `asyncio.Semaphore` gating, `_notify_start`/`_aggregate_and_notify`
//! progress events) and on this codebase's own
//! `GlobalResourceManager`-style semaphore gating, generalized from a
//! single global pool to one bounded gate per task kind so a slow
//! `search_image` batch can't starve `translation`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::events::SessionEvent;
use menu_pipeline_domain::ports::{
    AllergenProvider, DescribeProvider, DistributedLock, EventPublisher, ImageSearchProvider, IngredientProvider,
    ItemStore, TranslateProvider,
};
use menu_pipeline_domain::value_objects::{ItemId, SessionId, TaskKind};
use menu_pipeline_domain::{EnrichmentUpdate, MenuItem};

/// Tuning for a single task kind's batch run.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub lock_ttl: Duration,
    pub lock_timeout: Duration,
    pub lock_retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_concurrent: 8,
            lock_ttl: Duration::from_secs(10),
            lock_timeout: Duration::from_secs(5),
            lock_retry_delay: Duration::from_millis(100),
            max_retries: 3,
        }
    }
}

/// One enrichment outcome, used to compute a batch's `success_rate`.
struct ItemOutcome {
    succeeded: bool,
}

/// Holds the five provider trait objects the dispatcher fans work out to.
pub struct Providers {
    pub translate: Arc<dyn TranslateProvider>,
    pub describe: Arc<dyn DescribeProvider>,
    pub allergen: Arc<dyn AllergenProvider>,
    pub ingredient: Arc<dyn IngredientProvider>,
    pub image_search: Arc<dyn ImageSearchProvider>,
}

/// Coordinates the five-way enrichment fan-out for a completed session.
pub struct EnrichmentDispatcher {
    item_store: Arc<dyn ItemStore>,
    publisher: Arc<dyn EventPublisher>,
    lock: Arc<dyn DistributedLock>,
    providers: Providers,
    config: BatchConfig,
}

impl EnrichmentDispatcher {
    pub fn new(
        item_store: Arc<dyn ItemStore>,
        publisher: Arc<dyn EventPublisher>,
        lock: Arc<dyn DistributedLock>,
        providers: Providers,
        config: BatchConfig,
    ) -> Self {
        Self { item_store, publisher, lock, providers, config }
    }

    /// Publishes `parallel_tasks_started`, fetches the item descriptors
    /// once (the job payload spec.md §4.2 says each queued job carries:
    /// identifier, name, category, price), then spawns one independent
    /// batch run per task kind, all racing concurrently (spec.md invariant
    /// 2: the five kinds have no ordering dependency on each other).
    pub async fn dispatch(self: &Arc<Self>, session_id: SessionId, item_ids: Vec<ItemId>) {
        let task_names: Vec<&str> = TaskKind::ALL.iter().map(|k| k.name()).collect();
        let started = SessionEvent::parallel_tasks_started(&session_id, task_names, serde_json::json!({}), item_ids.len());
        let _ = self.publisher.publish(&session_id, &started).await;

        let items = match self.item_store.find_by_session(&session_id).await {
            Ok(items) => items,
            Err(err) => {
                error!(session_id = %session_id, error = %err, "failed to load items for enrichment fan-out");
                return;
            }
        };
        let by_id: std::collections::HashMap<ItemId, MenuItem> = items.into_iter().map(|i| (i.id().clone(), i)).collect();
        let items: Vec<MenuItem> = item_ids.into_iter().filter_map(|id| by_id.get(&id).cloned()).collect();

        let mut handles = Vec::with_capacity(TaskKind::ALL.len());
        for kind in TaskKind::ALL {
            let this = Arc::clone(self);
            let session_id = session_id.clone();
            let items = items.clone();
            handles.push(tokio::spawn(async move { this.run_batch(kind, session_id, items).await }));
        }
        join_all(handles).await;
    }

    /// Runs one task kind's batch over every item, split into chunks of
    /// `batch_size` with a semaphore sized to `max_concurrent` bounding how
    /// many chunks run at once — items within a chunk all run concurrently,
    /// uncapped beyond that. Grounded on the upstream `batch_processor`'s
    /// `asyncio.Semaphore(max_concurrent_batches)` wrapping each
    /// `_process_batch`, with `gather` fanning the batch's own items out.
    /// Brackets the run with the `progress_update` started/completed pair
    /// from spec.md §4.2, then publishes a `<task>_batch_completed` summary
    /// event.
    async fn run_batch(&self, kind: TaskKind, session_id: SessionId, items: Vec<MenuItem>) {
        let total = items.len();
        let started = SessionEvent::progress_update(
            &session_id,
            kind.name(),
            "started",
            serde_json::json!({ "total": total, "batch_size": self.config.batch_size }),
            false,
        );
        let _ = self.publisher.publish(&session_id, &started).await;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let batch_runs = items.chunks(self.config.batch_size).map(|chunk| {
            let semaphore = Arc::clone(&semaphore);
            let session_id = &session_id;
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                join_all(chunk.iter().map(|item| self.process_one(kind, session_id, item))).await
            }
        });

        let outcomes: Vec<ItemOutcome> = join_all(batch_runs).await.into_iter().flatten().collect();

        let completed = outcomes.iter().filter(|o| o.succeeded).count();
        let percent = if total == 0 { 100 } else { (completed * 100) / total };
        let finished = SessionEvent::progress_update(
            &session_id,
            kind.name(),
            "completed",
            serde_json::json!({ "completed": completed, "total": total, "percent": percent }),
            false,
        );
        let _ = self.publisher.publish(&session_id, &finished).await;

        self.aggregate_and_notify(kind, &session_id, &outcomes).await;
    }

    /// Acquires the item's distributed lock, calls the provider exactly
    /// once, then persists the result with its own bounded retry loop, and
    /// publishes a `menu_update` event. Grounded on the upstream worker
    /// task's `lock:menu_update:<task>:<item_id>` key.
    ///
    /// Two distinct retry semantics, not one: `process` (the provider call)
    /// is never retried — a provider failure is an item-level error that
    /// surfaces immediately. `persist` (the store update) retries up to
    /// three times with linear backoff, because its failures are almost
    /// always the bulk-insert's rows not being visible yet rather than a
    /// real fault.
    async fn process_one(&self, kind: TaskKind, session_id: &SessionId, item: &MenuItem) -> ItemOutcome {
        let item_id = item.id();
        let lock_key = format!("lock:menu_update:{}:{}", kind.name(), item_id.as_str());
        let guard = match self.lock.acquire(&lock_key, self.config.lock_ttl, self.config.lock_timeout, self.config.lock_retry_delay).await {
            Ok(guard) => guard,
            Err(err) => {
                warn!(item_id = %item_id, task = %kind, error = %err, "failed to acquire item lock");
                return ItemOutcome { succeeded: false };
            }
        };

        let update = match self.call_provider(kind, item.original_text(), item.category()).await {
            Ok(update) => update,
            Err(err) => {
                let event = SessionEvent::error(session_id, "provider_error", &err.to_string(), Some(kind.name()));
                let _ = self.publisher.publish(session_id, &event).await;
                let _ = guard.release().await;
                return ItemOutcome { succeeded: false };
            }
        };

        let succeeded = self.persist_with_retry(kind, session_id, item_id, update).await;
        let _ = guard.release().await;
        ItemOutcome { succeeded }
    }

    /// `update_partial` with three linear-backoff attempts (500ms, 1000ms,
    /// 1500ms), the delay schedule the bulk-insert visibility race calls for.
    async fn persist_with_retry(&self, kind: TaskKind, session_id: &SessionId, item_id: &ItemId, update: EnrichmentUpdate) -> bool {
        const PERSIST_BACKOFF: [Duration; 3] = [Duration::from_millis(500), Duration::from_millis(1000), Duration::from_millis(1500)];

        let mut last_err = None;
        for (attempt, delay) in PERSIST_BACKOFF.iter().enumerate() {
            match self.item_store.apply_enrichment(item_id, update.clone()).await {
                Ok(true) => {
                    let menu_data = enrichment_payload(kind, &update);
                    let event = SessionEvent::menu_update(session_id, item_id.as_str(), menu_data);
                    let _ = self.publisher.publish(session_id, &event).await;
                    return true;
                }
                Ok(false) => last_err = Some(PipelineError::store_error("item not yet visible")),
                Err(err) => last_err = Some(err),
            }
            if attempt + 1 < PERSIST_BACKOFF.len() {
                tokio::time::sleep(*delay).await;
            }
        }

        if let Some(err) = last_err {
            warn!(item_id = %item_id, task = %kind, error = %err, "enrichment persist exhausted retries");
        }
        false
    }

    async fn call_provider(&self, kind: TaskKind, name: &str, category: &str) -> Result<EnrichmentUpdate, PipelineError> {
        match kind {
            TaskKind::Translation => {
                let (translation, category_translation) = self.providers.translate.translate(name, category).await?;
                Ok(EnrichmentUpdate::translation(translation, category_translation))
            }
            TaskKind::Description => {
                let description = self.providers.describe.describe(name, category).await?;
                Ok(EnrichmentUpdate::description(fallback_description(description, name)))
            }
            TaskKind::Allergen => {
                let info = self.providers.allergen.extract_allergens(name, category).await?;
                Ok(EnrichmentUpdate::allergen(serialize_allergens(&info)))
            }
            TaskKind::Ingredient => {
                let info = self.providers.ingredient.extract_ingredients(name, category).await?;
                Ok(EnrichmentUpdate::ingredient(serialize_ingredients(&info)))
            }
            TaskKind::SearchImage => {
                const IMAGE_SEARCH_COUNT: usize = 3;
                let hits = self.providers.image_search.search(name, category, IMAGE_SEARCH_COUNT).await?;
                let encoded = if hits.is_empty() { None } else { Some(serde_json::to_string(&hits)?) };
                Ok(EnrichmentUpdate::image_search(encoded))
            }
        }
    }

    async fn aggregate_and_notify(&self, kind: TaskKind, session_id: &SessionId, outcomes: &[ItemOutcome]) {
        let total = outcomes.len();
        let completed = outcomes.iter().filter(|o| o.succeeded).count();
        let success_rate = if total == 0 { 1.0 } else { completed as f64 / total as f64 };
        let event = SessionEvent::batch_completed(
            session_id,
            &kind.batch_completed_event(),
            kind.name(),
            completed,
            total,
            success_rate,
            serde_json::json!({ "failed": total - completed }),
        );
        let _ = self.publisher.publish(session_id, &event).await;
    }
}

/// Canned filler used when the describe provider has nothing to say,
/// per spec.md §4.3's description serialization rule.
fn fallback_description(description: String, name: &str) -> String {
    if description.trim().is_empty() {
        format!("{name} is a menu item; no further description is available.")
    } else {
        description
    }
}

/// `allergy` field rule from spec.md §4.3: a comma-joined list when the
/// provider found any, `"None"` when it explicitly reports allergen-free,
/// `"Unable to determine"` otherwise.
fn serialize_allergens(info: &menu_pipeline_domain::ports::AllergenInfo) -> String {
    if !info.allergens.is_empty() {
        info.allergens.join(", ")
    } else if info.allergen_free {
        "None".to_string()
    } else {
        "Unable to determine".to_string()
    }
}

/// `ingredient` field rule from spec.md §4.3: a comma-joined main-ingredient
/// list, falling back to the cuisine category or cooking methods when the
/// list is empty, else a fixed "unknown" marker.
fn serialize_ingredients(info: &menu_pipeline_domain::ports::IngredientInfo) -> String {
    if !info.main_ingredients.is_empty() {
        info.main_ingredients.join(", ")
    } else if !info.cuisine_category.trim().is_empty() {
        info.cuisine_category.clone()
    } else if !info.cooking_method.is_empty() {
        info.cooking_method.join(", ")
    } else {
        "材料情報不明".to_string()
    }
}

/// The task-kind-specific subset of fields `menu_update` carries, mirroring
/// the upstream publisher's per-task-kind payload special-casing.
fn enrichment_payload(kind: TaskKind, update: &EnrichmentUpdate) -> serde_json::Value {
    match kind {
        TaskKind::Translation => serde_json::json!({
            "translation": update.translation,
            "category_translation": update.category_translation,
        }),
        TaskKind::Description => serde_json::json!({ "description": update.description }),
        TaskKind::Allergen => serde_json::json!({ "allergen_info": update.allergen_text }),
        TaskKind::Ingredient => serde_json::json!({ "ingredient_info": update.ingredient_text }),
        TaskKind::SearchImage => serde_json::json!({ "search_engine": update.image_search.clone().flatten() }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::StreamExt;

    use menu_pipeline_domain::ports::EventSubscriber;

    use crate::infrastructure::providers::{
        PassThroughAllergenProvider, PassThroughDescribeProvider, PassThroughImageSearchProvider,
        PassThroughIngredientProvider, PassThroughTranslateProvider,
    };
    use crate::infrastructure::{InMemoryDistributedLock, InMemoryEventBus};

    use super::*;

    #[test]
    fn success_rate_is_one_when_batch_is_empty() {
        let outcomes: Vec<ItemOutcome> = vec![];
        let total = outcomes.len();
        let completed = outcomes.iter().filter(|o| o.succeeded).count();
        let rate = if total == 0 { 1.0 } else { completed as f64 / total as f64 };
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn enrichment_payload_only_carries_its_own_task_fields() {
        let update = EnrichmentUpdate::description("Fresh raw fish.".into());
        let payload = enrichment_payload(TaskKind::Description, &update);
        assert_eq!(payload["description"], "Fresh raw fish.");
        assert!(payload.get("translation").is_none());
    }

    /// An [`ItemStore`] whose `apply_enrichment` reports the item invisible
    /// for its first `fail_until` calls, then visible from then on —
    /// standing in for the bulk-insert visibility race `persist_with_retry`
    /// is built to ride out.
    struct FlakyItemStore {
        attempts: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl ItemStore for FlakyItemStore {
        async fn bulk_insert(&self, _items: &[MenuItem]) -> Result<(), PipelineError> {
            Ok(())
        }

        async fn find(&self, _id: &ItemId) -> Result<Option<MenuItem>, PipelineError> {
            Ok(None)
        }

        async fn find_by_session(&self, _session_id: &SessionId) -> Result<Vec<MenuItem>, PipelineError> {
            Ok(Vec::new())
        }

        async fn apply_enrichment(&self, _id: &ItemId, _update: EnrichmentUpdate) -> Result<bool, PipelineError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(attempt >= self.fail_until)
        }
    }

    fn stub_providers() -> Providers {
        Providers {
            translate: Arc::new(PassThroughTranslateProvider),
            describe: Arc::new(PassThroughDescribeProvider),
            allergen: Arc::new(PassThroughAllergenProvider),
            ingredient: Arc::new(PassThroughIngredientProvider),
            image_search: Arc::new(PassThroughImageSearchProvider),
        }
    }

    /// Spec.md §8 Scenario D: a store that reports the row invisible twice
    /// must be retried, not given up on, and the eventual success must still
    /// publish `menu_update` exactly once.
    #[tokio::test]
    async fn persist_with_retry_retries_until_the_item_becomes_visible() {
        let session_id = SessionId::generate();
        let item_id = ItemId::generate();

        let store = Arc::new(FlakyItemStore { attempts: AtomicUsize::new(0), fail_until: 2 });
        let bus = Arc::new(InMemoryEventBus::new());
        let lock = Arc::new(InMemoryDistributedLock::new());
        let dispatcher =
            EnrichmentDispatcher::new(store.clone(), bus.clone(), lock, stub_providers(), BatchConfig::default());

        let mut events = bus.subscribe(&session_id).await.unwrap();

        let update = EnrichmentUpdate::translation("Sushi".into(), "Japanese".into());
        let succeeded = dispatcher.persist_with_retry(TaskKind::Translation, &session_id, &item_id, update).await;

        assert!(succeeded, "the third attempt must succeed once the store reports the item visible");
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3, "must have made exactly three attempts: two failures then a success");

        let published =
            tokio::time::timeout(Duration::from_millis(500), events.next()).await.expect("no menu_update published in time").expect("event stream ended early");
        assert_eq!(published.kind, "menu_update");
    }

    /// All three attempts reporting the item invisible must exhaust the
    /// retry budget and report failure rather than retrying forever.
    #[tokio::test]
    async fn persist_with_retry_gives_up_after_three_attempts() {
        let session_id = SessionId::generate();
        let item_id = ItemId::generate();

        let store = Arc::new(FlakyItemStore { attempts: AtomicUsize::new(0), fail_until: usize::MAX });
        let bus = Arc::new(InMemoryEventBus::new());
        let lock = Arc::new(InMemoryDistributedLock::new());
        let dispatcher =
            EnrichmentDispatcher::new(store.clone(), bus.clone(), lock, stub_providers(), BatchConfig::default());

        let update = EnrichmentUpdate::translation("Sushi".into(), "Japanese".into());
        let succeeded = dispatcher.persist_with_retry(TaskKind::Translation, &session_id, &item_id, update).await;

        assert!(!succeeded);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3, "must stop after the third attempt rather than retrying indefinitely");
    }
}
