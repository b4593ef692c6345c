//! # Observability: Logging
//!
//! Installs the process-wide `tracing` subscriber. Grounded on this
//! codebase's own `infrastructure/logging/observability.rs`: a single
//! `fmt` subscriber, env-filter-overridable, installed once at process
//! startup by the composition root, after which every `#[instrument]`d
//! call in the application layer (`PipelineCoordinator::process_menu_image`,
//! the enrichment dispatcher's batch runs) is captured automatically.

use tracing_subscriber::EnvFilter;

use menu_pipeline_bootstrap::config::LogLevel;

/// Installs the global `tracing` subscriber at `level`, honoring an
/// `RUST_LOG` environment override if present (the `config`/env-var
/// layering convention this codebase uses throughout the bootstrap layer).
///
/// Safe to call at most once per process; a second call is a no-op logged
/// at `WARN` by `tracing`'s own global-default guard rather than a panic.
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic_on_repeated_calls() {
        init_tracing(LogLevel::Debug);
        init_tracing(LogLevel::Info);
    }
}
