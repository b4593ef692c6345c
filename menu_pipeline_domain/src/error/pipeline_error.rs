//! # Domain Error System
//!
//! A single hierarchical error type for the menu enrichment pipeline,
//! organized the way the upstream domain layers its own error taxonomy:
//! categorized failures, each carrying enough context to log and to decide
//! whether the caller should retry.
//!
//! ## Categories
//!
//! - **Input validation**: [`PipelineError::InvalidInput`]
//! - **Session lifecycle**: [`PipelineError::DuplicateProcessing`],
//!   [`PipelineError::AlreadyCompleted`]
//! - **Stage execution**: [`PipelineError::StageFailed`],
//!   [`PipelineError::ProviderError`]
//! - **Coordination**: [`PipelineError::LockTimeout`],
//!   [`PipelineError::BroadcastFailed`]
//! - **Infrastructure**: [`PipelineError::StoreError`],
//!   [`PipelineError::SerializationError`]
//! - **System**: [`PipelineError::InternalError`]

use thiserror::Error;

/// Errors that can occur anywhere in the menu enrichment pipeline domain.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session is already being processed: {0}")]
    DuplicateProcessing(String),

    #[error("session is already completed: {0}")]
    AlreadyCompleted(String),

    #[error("stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    #[error("provider call failed: {0}")]
    ProviderError(String),

    #[error("failed to acquire lock for resource '{0}' within timeout")]
    LockTimeout(String),

    #[error("event broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn stage_failed(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StageFailed { stage: stage.into(), message: msg.into() }
    }

    pub fn provider_error(msg: impl Into<String>) -> Self {
        Self::ProviderError(msg.into())
    }

    pub fn store_error(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Whether this error represents a condition a caller might reasonably
    /// retry (as opposed to a permanent rejection).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::LockTimeout(_) | PipelineError::StoreError(_))
    }

    /// Coarse category, useful for metrics labels and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "validation",
            PipelineError::DuplicateProcessing(_) => "session_lifecycle",
            PipelineError::AlreadyCompleted(_) => "session_lifecycle",
            PipelineError::StageFailed { .. } => "stage_execution",
            PipelineError::ProviderError(_) => "provider",
            PipelineError::LockTimeout(_) => "coordination",
            PipelineError::BroadcastFailed(_) => "coordination",
            PipelineError::StoreError(_) => "infrastructure",
            PipelineError::SerializationError(_) => "infrastructure",
            PipelineError::InternalError(_) => "system",
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_stable_per_variant() {
        assert_eq!(PipelineError::invalid_input("x").category(), "validation");
        assert_eq!(PipelineError::stage_failed("ocr", "boom").category(), "stage_execution");
    }

    #[test]
    fn lock_timeout_is_recoverable() {
        assert!(PipelineError::LockTimeout("lock:foo".into()).is_recoverable());
        assert!(!PipelineError::AlreadyCompleted("s1".into()).is_recoverable());
    }
}
