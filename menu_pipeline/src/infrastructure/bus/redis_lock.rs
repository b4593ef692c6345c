//! # Redis Distributed Lock
//!
//! Grounded on the upstream `RedisDistributedLock`: `SET key value NX EX
//! ttl` to acquire (atomic, first writer wins), polling at `retry_delay`
//! until `timeout` elapses, and a Lua script to release so a holder can
//! never delete a lock it no longer owns — the classic compare-and-delete
//! pattern, since a plain `DEL` after the TTL expired could delete a lock
//! someone else has since acquired.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use uuid::Uuid;

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::ports::{DistributedLock, LockGuard};

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisDistributedLock {
    conn: ConnectionManager,
}

impl RedisDistributedLock {
    pub async fn connect(redis_url: &str) -> Result<Self, PipelineError> {
        let client = redis::Client::open(redis_url).map_err(|e| PipelineError::store_error(e.to_string()))?;
        let conn = ConnectionManager::new(client).await.map_err(|e| PipelineError::store_error(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        timeout: Duration,
        retry_delay: Duration,
    ) -> Result<Box<dyn LockGuard>, PipelineError> {
        let token = Uuid::new_v4().to_string();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut conn = self.conn.clone();

        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(key)
                .arg(&token)
                .arg("NX")
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, Option<String>>(&mut conn)
                .await
                .map_err(|e| PipelineError::store_error(e.to_string()))?
                .is_some();

            if acquired {
                return Ok(Box::new(RedisLockGuard { conn: self.conn.clone(), key: key.to_string(), token }));
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(PipelineError::LockTimeout(key.to_string()));
            }
            tokio::time::sleep(retry_delay).await;
        }
    }
}

struct RedisLockGuard {
    conn: ConnectionManager,
    key: String,
    token: String,
}

#[async_trait]
impl LockGuard for RedisLockGuard {
    async fn release(self: Box<Self>) -> Result<bool, PipelineError> {
        let mut conn = self.conn.clone();
        let released: i64 = Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| PipelineError::store_error(e.to_string()))?;
        Ok(released == 1)
    }
}
