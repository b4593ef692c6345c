//! # Distributed Lock Port
//!
//! Mutual exclusion across worker processes, grounded on the upstream
//! `RedisDistributedLock`: `SET key value NX EX ttl` to acquire, a
//! compare-and-delete script to release so a holder can never release a
//! lock it no longer owns (e.g. after its own TTL expired and someone
//! else acquired it).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::PipelineError;

/// An acquired lock handle. Implementations release on `Drop` is
/// deliberately NOT provided here — release is fallible (it's a network
/// call) and callers must be able to observe and handle that failure, so
/// release is an explicit async method instead of a destructor.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Releases the lock if and only if this guard is still its current
    /// holder. Returns `false` if the lock had already expired and been
    /// claimed by someone else.
    async fn release(self: Box<Self>) -> Result<bool, PipelineError>;
}

#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Attempts to acquire `key`, polling at `retry_delay` intervals until
    /// `timeout` elapses. The lock expires after `ttl` even if never
    /// explicitly released, bounding the damage of a crashed holder.
    /// Returns `Err(PipelineError::LockTimeout)` if `timeout` elapses
    /// first.
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        timeout: Duration,
        retry_delay: Duration,
    ) -> Result<Box<dyn LockGuard>, PipelineError>;
}
