//! # Metrics
//!
//! Prometheus-based observability, grounded on this codebase's own
//! `MetricsService`: counters and gauges registered once at startup,
//! exposed for scraping, low overhead on the hot path.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use menu_pipeline_domain::error::PipelineError;

fn metrics_err(context: &str, err: prometheus::Error) -> PipelineError {
    PipelineError::internal_error(format!("failed to create {context} metric: {err}"))
}

/// Observability surface for one running coordinator/worker process.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Arc<Registry>,

    pub sessions_processed_total: IntCounter,
    pub sessions_failed_total: IntCounter,
    pub session_duration_seconds: Histogram,
    pub items_created_total: IntCounter,

    /// Labeled by task kind (`translation`, `description`, ...).
    pub enrichment_tasks_completed_total: IntCounterVec,
    pub enrichment_tasks_failed_total: IntCounterVec,
    pub active_sessions: IntGauge,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();
        let ns = "menu_pipeline";

        let sessions_processed_total = IntCounter::with_opts(
            Opts::new("sessions_processed_total", "Total menu image sessions that reached a terminal status").namespace(ns),
        )
        .map_err(|e| metrics_err("sessions_processed_total", e))?;

        let sessions_failed_total = IntCounter::with_opts(
            Opts::new("sessions_failed_total", "Total sessions that ended in FAILED").namespace(ns),
        )
        .map_err(|e| metrics_err("sessions_failed_total", e))?;

        let session_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("session_duration_seconds", "Time from PROCESSING to a terminal status")
                .namespace(ns)
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )
        .map_err(|e| metrics_err("session_duration_seconds", e))?;

        let items_created_total =
            IntCounter::with_opts(Opts::new("items_created_total", "Total menu items inserted by stage 3").namespace(ns))
                .map_err(|e| metrics_err("items_created_total", e))?;

        let enrichment_tasks_completed_total = IntCounterVec::new(
            Opts::new("enrichment_tasks_completed_total", "Enrichment tasks that completed successfully").namespace(ns),
            &["task_kind"],
        )
        .map_err(|e| metrics_err("enrichment_tasks_completed_total", e))?;

        let enrichment_tasks_failed_total = IntCounterVec::new(
            Opts::new("enrichment_tasks_failed_total", "Enrichment tasks that exhausted their retries").namespace(ns),
            &["task_kind"],
        )
        .map_err(|e| metrics_err("enrichment_tasks_failed_total", e))?;

        let active_sessions =
            IntGauge::with_opts(Opts::new("active_sessions", "Sessions currently in PROCESSING").namespace(ns))
                .map_err(|e| metrics_err("active_sessions", e))?;

        registry.register(Box::new(sessions_processed_total.clone())).map_err(|e| metrics_err("register", e))?;
        registry.register(Box::new(sessions_failed_total.clone())).map_err(|e| metrics_err("register", e))?;
        registry.register(Box::new(session_duration_seconds.clone())).map_err(|e| metrics_err("register", e))?;
        registry.register(Box::new(items_created_total.clone())).map_err(|e| metrics_err("register", e))?;
        registry
            .register(Box::new(enrichment_tasks_completed_total.clone()))
            .map_err(|e| metrics_err("register", e))?;
        registry.register(Box::new(enrichment_tasks_failed_total.clone())).map_err(|e| metrics_err("register", e))?;
        registry.register(Box::new(active_sessions.clone())).map_err(|e| metrics_err("register", e))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_processed_total,
            sessions_failed_total,
            session_duration_seconds,
            items_created_total,
            enrichment_tasks_completed_total,
            enrichment_tasks_failed_total,
            active_sessions,
        })
    }

    /// Renders the current metric snapshot in the Prometheus text exposition
    /// format, for a `/metrics` endpoint.
    pub fn render(&self) -> Result<String, PipelineError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf).map_err(|e| PipelineError::internal_error(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| PipelineError::internal_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_every_registered_metric_family() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.sessions_processed_total.inc();
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("menu_pipeline_sessions_processed_total"));
    }
}
