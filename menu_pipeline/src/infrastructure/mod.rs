//! # Infrastructure Layer
//!
//! Adapters that implement the domain layer's port traits against real or
//! in-memory backends, plus the process-wide concerns (metrics, logging,
//! configuration) that sit beside them rather than behind a port.

pub mod bus;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod providers;
pub mod stores;

pub use bus::{InMemoryDistributedLock, InMemoryEventBus, RedisDistributedLock, RedisEventBus};
pub use config::PipelineConfig;
pub use gateway::EventStreamGateway;
pub use logging::init_tracing;
pub use metrics::PipelineMetrics;
pub use stores::{ensure_schema, InMemoryItemStore, InMemorySessionStore, SqlxItemStore, SqlxSessionStore};
