//! # Postgres-Backed Stores
//!
//! [`SessionStore`] and [`ItemStore`] over Postgres via `sqlx`. Each entity
//! is persisted as a single JSONB column keyed by its id rather than
//! decomposed into per-field relational columns — the entities are small,
//! almost entirely read-and-rewritten-whole, and already implement
//! `Serialize`/`Deserialize` for the event envelope, so a JSONB blob avoids
//! a parallel hand-maintained column mapping that could drift from the
//! domain type. `sqlx`'s runtime `query`/`query_as` (rather than the
//! compile-time-checked `query!` macro) is used throughout since this
//! crate is never built against a live database in this environment.

use async_trait::async_trait;
use sqlx::PgPool;

use menu_pipeline_domain::entities::{Session, SessionStatus};
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::ports::{ItemStore, SessionStore};
use menu_pipeline_domain::value_objects::{ItemId, SessionId};
use menu_pipeline_domain::{EnrichmentUpdate, MenuItem};

fn store_err(e: sqlx::Error) -> PipelineError {
    PipelineError::store_error(e.to_string())
}

/// Runs the two tables this adapter needs. Idempotent; safe to call on
/// every startup instead of requiring a separate migration step.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            body JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(store_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS menu_items (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            body JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(store_err)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS menu_items_session_id_idx ON menu_items (session_id)")
        .execute(pool)
        .await
        .map_err(store_err)?;

    Ok(())
}

pub struct SqlxSessionStore {
    pool: PgPool,
}

impl SqlxSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlxSessionStore {
    async fn find(&self, id: &SessionId) -> Result<Option<Session>, PipelineError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT body FROM sessions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(|(body,)| serde_json::from_value(body).map_err(PipelineError::from)).transpose()
    }

    async fn upsert(&self, session: &Session) -> Result<(), PipelineError> {
        let body = serde_json::to_value(session)?;
        sqlx::query(
            r#"
            INSERT INTO sessions (id, status, body, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE SET status = $2, body = $3, updated_at = now()
            "#,
        )
        .bind(session.id().as_str())
        .bind(format!("{:?}", session.status()))
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_stage(&self, id: &SessionId, stage_name: &str, payload: serde_json::Value) -> Result<(), PipelineError> {
        let mut session = self.find(id).await?.ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.record_stage(stage_name, payload);
        self.upsert(&session).await
    }

    async fn append_item_ids(&self, id: &SessionId, item_ids: &[ItemId]) -> Result<(), PipelineError> {
        let mut session = self.find(id).await?.ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.add_item_ids(item_ids.iter().cloned());
        self.upsert(&session).await
    }

    async fn set_status(&self, id: &SessionId, status: SessionStatus) -> Result<(), PipelineError> {
        let mut session = self.find(id).await?.ok_or_else(|| PipelineError::store_error("session not found"))?;
        session.transition_to(status)?;
        self.upsert(&session).await
    }
}

pub struct SqlxItemStore {
    pool: PgPool,
}

impl SqlxItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for SqlxItemStore {
    async fn bulk_insert(&self, items: &[MenuItem]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for item in items {
            let body = serde_json::to_value(item)?;
            sqlx::query("INSERT INTO menu_items (id, session_id, body, updated_at) VALUES ($1, $2, $3, now())")
                .bind(item.id().as_str())
                .bind(item.session_id().as_str())
                .bind(body)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn find(&self, id: &ItemId) -> Result<Option<MenuItem>, PipelineError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT body FROM menu_items WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(|(body,)| serde_json::from_value(body).map_err(PipelineError::from)).transpose()
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<MenuItem>, PipelineError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT body FROM menu_items WHERE session_id = $1")
            .bind(session_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(|(body,)| serde_json::from_value(body).map_err(PipelineError::from)).collect()
    }

    /// Updates exactly the named enrichment fields in place with chained
    /// `jsonb_set` calls, rather than a read-modify-write of the whole row.
    /// Up to five enrichment workers can race on the *same* item (each
    /// owning a disjoint field); a read-then-overwrite-the-whole-blob
    /// round trip would let a slower worker's stale read clobber a faster
    /// worker's already-committed field (invariant 5's "all others
    /// preserved" would not hold under concurrency). `jsonb_set` lets
    /// Postgres apply each worker's write atomically against the current
    /// row regardless of interleaving.
    async fn apply_enrichment(&self, id: &ItemId, update: EnrichmentUpdate) -> Result<bool, PipelineError> {
        // Each entry is "this field is part of the update" (matching
        // `EnrichmentUpdate`'s own outer-`Option` convention) paired with
        // the value to write, which may itself be `None` — `image_search`
        // legitimately writes a null when a search comes back empty
        // (spec.md §4.3), and that write must still happen.
        let mut set_fields: Vec<(&str, Option<String>)> = Vec::new();
        if let Some(v) = update.translation {
            set_fields.push(("translation", Some(v)));
        }
        if let Some(v) = update.category_translation {
            set_fields.push(("category_translation", Some(v)));
        }
        if let Some(v) = update.description {
            set_fields.push(("description", Some(v)));
        }
        if let Some(v) = update.allergen_text {
            set_fields.push(("allergen_text", Some(v)));
        }
        if let Some(v) = update.ingredient_text {
            set_fields.push(("ingredient_text", Some(v)));
        }
        if let Some(inner) = update.image_search {
            set_fields.push(("image_search", inner));
        }
        if set_fields.is_empty() {
            return Ok(self.find(id).await?.is_some());
        }

        let mut sql = String::from("UPDATE menu_items SET body = ");
        let mut expr = String::from("body");
        let mut bind_index = 2; // $1 is reserved for id
        for (field, _) in &set_fields {
            // `COALESCE(..., 'null'::jsonb)` turns a bound SQL NULL into a
            // stored JSON null rather than leaving the jsonb_set call a
            // no-op, so a touched-but-null field overwrites whatever was
            // there before instead of silently preserving it.
            expr = format!(
                "jsonb_set({expr}, '{{enrichment,{field}}}', COALESCE(to_jsonb(${bind_index}::text), 'null'::jsonb), true)"
            );
            bind_index += 1;
        }
        sql.push_str(&expr);
        sql.push_str(", updated_at = now() WHERE id = $1 RETURNING id");

        let mut query = sqlx::query_as::<_, (String,)>(&sql).bind(id.as_str());
        for (_, value) in &set_fields {
            query = query.bind(value);
        }
        let updated = query.fetch_optional(&self.pool).await.map_err(store_err)?;
        Ok(updated.is_some())
    }
}
