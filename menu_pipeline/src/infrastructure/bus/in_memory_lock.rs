//! In-process stand-in for [`RedisDistributedLock`](super::redis_lock::RedisDistributedLock),
//! used by tests. Same acquire/ttl/compare-and-delete-release semantics,
//! minus the network round trip.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::ports::{DistributedLock, LockGuard};

struct Entry {
    token: String,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct InMemoryDistributedLock {
    held: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self, key: &str, ttl: Duration, token: &str) -> bool {
        let mut held = self.held.lock();
        let now = Instant::now();
        if let Some(entry) = held.get(key) {
            if entry.expires_at > now {
                return false;
            }
        }
        held.insert(key.to_string(), Entry { token: token.to_string(), expires_at: now + ttl });
        true
    }
}

#[async_trait]
impl DistributedLock for InMemoryDistributedLock {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        timeout: Duration,
        retry_delay: Duration,
    ) -> Result<Box<dyn LockGuard>, PipelineError> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_acquire(key, ttl, &token) {
                return Ok(Box::new(InMemoryLockGuard { key: key.to_string(), token, held: Arc::clone(&self.held) }));
            }
            if Instant::now() >= deadline {
                return Err(PipelineError::LockTimeout(key.to_string()));
            }
            tokio::time::sleep(retry_delay).await;
        }
    }
}

struct InMemoryLockGuard {
    key: String,
    token: String,
    held: Arc<Mutex<HashMap<String, Entry>>>,
}

#[async_trait]
impl LockGuard for InMemoryLockGuard {
    async fn release(self: Box<Self>) -> Result<bool, PipelineError> {
        let mut held = self.held.lock();
        match held.get(&self.key) {
            Some(entry) if entry.token == self.token => {
                held.remove(&self.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_blocks_until_release() {
        let lock = InMemoryDistributedLock::new();
        let guard = lock.acquire("lock:x", Duration::from_secs(5), Duration::from_millis(50), Duration::from_millis(10)).await.unwrap();

        let contended = lock.acquire("lock:x", Duration::from_secs(5), Duration::from_millis(50), Duration::from_millis(10)).await;
        assert!(matches!(contended, Err(PipelineError::LockTimeout(_))));

        assert!(guard.release().await.unwrap());
        let after_release = lock.acquire("lock:x", Duration::from_secs(5), Duration::from_millis(50), Duration::from_millis(10)).await;
        assert!(after_release.is_ok());
    }

    #[tokio::test]
    async fn stale_release_after_expiry_is_a_noop() {
        let lock = InMemoryDistributedLock::new();
        let guard = lock.acquire("lock:y", Duration::from_millis(20), Duration::from_millis(50), Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _new_holder = lock.acquire("lock:y", Duration::from_secs(5), Duration::from_millis(50), Duration::from_millis(5)).await.unwrap();

        assert!(!guard.release().await.unwrap(), "expired guard must not release the new holder's lock");
    }
}
