//! # Session Identifier
//!
//! A validated, opaque session identifier. Mirrors the upstream domain's
//! practice of wrapping every externally-visible identifier in a thin
//! newtype rather than passing bare `String`s around.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// Minimum length the Event Stream Gateway will accept for a session
/// identifier before opening a connection.
pub const MIN_GATEWAY_LENGTH: usize = 8;

/// Opaque, client-provided-or-server-generated session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validates and wraps a caller-supplied identifier. Only rejects the
    /// empty string — the duplicate-submission guard and the gateway's
    /// length check are separate concerns layered on top of this type.
    pub fn new(value: impl Into<String>) -> Result<Self, PipelineError> {
        let value = value.into();
        if value.is_empty() {
            return Err(PipelineError::invalid_input("session identifier must not be empty"));
        }
        Ok(Self(value))
    }

    /// Generates a fresh server-side identifier for an anonymous upload.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier is long enough for the Event Stream Gateway
    /// to accept a connection for it (spec: length >= 8).
    pub fn meets_gateway_length(&self) -> bool {
        self.0.len() >= MIN_GATEWAY_LENGTH
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
