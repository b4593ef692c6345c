// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! Bootstrap-phase configuration structure.
//!
//! ## Design Philosophy
//!
//! `AppConfig` holds **validated** configuration after:
//! 1. Command-line argument parsing
//! 2. Security validation
//! 3. Environment variable resolution (via the `config` crate, `MENU_PIPELINE_`
//!    prefix, `__` as the nesting separator)
//! 4. Default value application
//!
//! ## Immutability
//!
//! All configuration is immutable after creation: thread-safe to share across
//! async tasks without synchronization.
//!
//! ## Usage
//!
//! ```rust
//! use menu_pipeline_bootstrap::config::{AppConfig, LogLevel};
//!
//! let config = AppConfig::builder()
//!     .redis_url("redis://127.0.0.1:6379")
//!     .postgres_url("postgres://localhost/menu_pipeline")
//!     .log_level(LogLevel::Info)
//!     .build();
//!
//! println!("batch size: {}", config.batch_size());
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    redis_url: String,
    postgres_url: String,
    batch_size: usize,
    max_concurrent_batches: usize,
    lock_ttl: Duration,
    lock_retry_interval: Duration,
    heartbeat_interval: Duration,
    log_level: LogLevel,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Loads configuration from a config file (if present), then
    /// `MENU_PIPELINE_*` environment variables, falling back to defaults.
    /// Mirrors the upstream `config` crate layering: defaults, then file,
    /// then environment, each overriding the last.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("redis_url", "redis://127.0.0.1:6379")?
            .set_default("postgres_url", "postgres://localhost/menu_pipeline")?
            .set_default("batch_size", 20)?
            .set_default("max_concurrent_batches", 8)?
            .set_default("lock_ttl_secs", 10)?
            .set_default("lock_retry_interval_millis", 100)?
            .set_default("heartbeat_interval_secs", 15)?
            .set_default("log_level", "info")?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("MENU_PIPELINE").separator("__"));

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        Ok(raw.into())
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    pub fn postgres_url(&self) -> &str {
        &self.postgres_url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_concurrent_batches(&self) -> usize {
        self.max_concurrent_batches
    }

    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    pub fn lock_retry_interval(&self) -> Duration {
        self.lock_retry_interval
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    redis_url: String,
    postgres_url: String,
    batch_size: usize,
    max_concurrent_batches: usize,
    lock_ttl_secs: u64,
    lock_retry_interval_millis: u64,
    heartbeat_interval_secs: u64,
    log_level: LogLevel,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            redis_url: raw.redis_url,
            postgres_url: raw.postgres_url,
            batch_size: raw.batch_size,
            max_concurrent_batches: raw.max_concurrent_batches,
            lock_ttl: Duration::from_secs(raw.lock_ttl_secs),
            lock_retry_interval: Duration::from_millis(raw.lock_retry_interval_millis),
            heartbeat_interval: Duration::from_secs(raw.heartbeat_interval_secs),
            log_level: raw.log_level,
        }
    }
}

/// Builder for [`AppConfig`], used when callers want to bypass file/env
/// loading (tests, `process` one-shot invocations with CLI-only overrides).
#[derive(Debug)]
pub struct AppConfigBuilder {
    redis_url: String,
    postgres_url: String,
    batch_size: usize,
    max_concurrent_batches: usize,
    lock_ttl: Duration,
    lock_retry_interval: Duration,
    heartbeat_interval: Duration,
    log_level: LogLevel,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            postgres_url: "postgres://localhost/menu_pipeline".to_string(),
            batch_size: 20,
            max_concurrent_batches: 8,
            lock_ttl: Duration::from_secs(10),
            lock_retry_interval: Duration::from_millis(100),
            heartbeat_interval: Duration::from_secs(15),
            log_level: LogLevel::Info,
        }
    }
}

impl AppConfigBuilder {
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn postgres_url(mut self, url: impl Into<String>) -> Self {
        self.postgres_url = url.into();
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn max_concurrent_batches(mut self, count: usize) -> Self {
        self.max_concurrent_batches = count;
        self
    }

    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> AppConfig {
        AppConfig {
            redis_url: self.redis_url,
            postgres_url: self.postgres_url,
            batch_size: self.batch_size,
            max_concurrent_batches: self.max_concurrent_batches,
            lock_ttl: self.lock_ttl,
            lock_retry_interval: self.lock_retry_interval,
            heartbeat_interval: self.heartbeat_interval,
            log_level: self.log_level,
        }
    }
}
