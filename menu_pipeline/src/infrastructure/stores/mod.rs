//! # Persistence Adapters
//!
//! Concrete implementations of [`menu_pipeline_domain::ports::SessionStore`]
//! and [`menu_pipeline_domain::ports::ItemStore`]: a Postgres-backed pair for
//! production, and an in-memory pair for tests and `config check`.

pub mod in_memory_stores;
pub mod sqlx_stores;

pub use in_memory_stores::{InMemoryItemStore, InMemorySessionStore};
pub use sqlx_stores::{ensure_schema, SqlxItemStore, SqlxSessionStore};
