//! # Infrastructure Configuration
//!
//! The slice of [`menu_pipeline_bootstrap::config::AppConfig`] the
//! composition root needs to build infrastructure adapters: store/bus
//! connection strings and the tuning knobs [`crate::application::BatchConfig`]
//! and the distributed lock take. Kept as its own small, infrastructure-local
//! type (rather than having adapters depend on the bootstrap crate directly)
//! so the dependency arrow stays pointing outward-in, matching the teacher's
//! own `infrastructure/config` layering.

use std::time::Duration;

use crate::application::BatchConfig;

/// Connection strings and tuning knobs for the Redis/Postgres adapters and
/// the batch executor, derived from the bootstrap layer's validated
/// [`menu_pipeline_bootstrap::config::AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub redis_url: String,
    pub postgres_url: String,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub lock_ttl: Duration,
    pub lock_timeout: Duration,
    pub lock_retry_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl PipelineConfig {
    /// The [`BatchConfig`] every `EnrichmentDispatcher` task kind shares.
    /// `lock_timeout` is fixed at the spec's 10-second acquisition window
    /// (spec.md §4.3's lock contract) rather than taken from config — it is
    /// a correctness parameter, not an operational tuning knob.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            max_concurrent: self.max_concurrent_batches,
            lock_ttl: self.lock_ttl,
            lock_timeout: self.lock_timeout,
            lock_retry_delay: Duration::from_millis(100),
            max_retries: 3,
        }
    }
}

impl From<&menu_pipeline_bootstrap::config::AppConfig> for PipelineConfig {
    fn from(app: &menu_pipeline_bootstrap::config::AppConfig) -> Self {
        Self {
            redis_url: app.redis_url().to_string(),
            postgres_url: app.postgres_url().to_string(),
            batch_size: app.batch_size(),
            max_concurrent_batches: app.max_concurrent_batches(),
            lock_ttl: app.lock_ttl(),
            lock_timeout: Duration::from_secs(10),
            lock_retry_interval: app.lock_retry_interval(),
            heartbeat_interval: app.heartbeat_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_config_carries_through_batch_size_and_concurrency() {
        let app = menu_pipeline_bootstrap::config::AppConfig::builder().batch_size(7).max_concurrent_batches(2).build();
        let pipeline_config = PipelineConfig::from(&app);
        let batch = pipeline_config.batch_config();
        assert_eq!(batch.batch_size, 7);
        assert_eq!(batch.max_concurrent, 2);
        assert_eq!(batch.lock_timeout, Duration::from_secs(10));
    }
}
