//! # Event Bus and Distributed Locking Adapters
//!
//! Concrete implementations of [`menu_pipeline_domain::ports::EventPublisher`],
//! [`menu_pipeline_domain::ports::EventSubscriber`], and
//! [`menu_pipeline_domain::ports::DistributedLock`]: a Redis-backed pair for
//! production, and an in-memory pair for tests and `config check`.

pub mod in_memory_bus;
pub mod in_memory_lock;
pub mod redis_bus;
pub mod redis_lock;

pub use in_memory_bus::InMemoryEventBus;
pub use in_memory_lock::InMemoryDistributedLock;
pub use redis_bus::RedisEventBus;
pub use redis_lock::RedisDistributedLock;
