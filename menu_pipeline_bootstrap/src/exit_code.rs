// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions, so an
//! operator's monitoring can distinguish a config error from a transient
//! store failure without parsing log text.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use menu_pipeline_bootstrap::exit_code::{result_to_exit_code};
//!
//! fn run_application() -> anyhow::Result<()> {
//!     Ok(())
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     result_to_exit_code(run_application())
//! }
//! ```

use std::fmt;
use std::process;

use menu_pipeline_domain::error::PipelineError;

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    UsageError = 64,

    /// Data format error (65) - invalid input, malformed session state
    DataError = 65,

    /// Service unavailable (69) - lock contention, broadcast failure
    Unavailable = 69,

    /// Internal software error (70) - stage/provider failure
    Software = 70,

    /// I/O error (74) - store/infrastructure failure
    IoError = 74,

    /// Interrupted by signal (SIGINT - Ctrl+C) (130)
    Interrupted = 130,

    /// Terminated by signal (SIGTERM) (143)
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::IoError => "I/O error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Maps a domain error's [`PipelineError::category`] to the exit code a
/// monitoring script can act on.
pub fn map_error_to_exit_code(error: &PipelineError) -> ExitCode {
    match error.category() {
        "validation" | "session_lifecycle" => ExitCode::DataError,
        "coordination" => ExitCode::Unavailable,
        "infrastructure" => ExitCode::IoError,
        "stage_execution" | "provider" | "system" => ExitCode::Software,
        _ => ExitCode::Error,
    }
}

/// Converts the binary's top-level result into a process exit code. Errors
/// that are not a [`PipelineError`] (CLI parsing, I/O at the bootstrap
/// boundary) fall back to the generic [`ExitCode::Error`].
pub fn result_to_exit_code(result: anyhow::Result<()>) -> process::ExitCode {
    match result {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => match err.downcast_ref::<PipelineError>() {
            Some(pipeline_err) => map_error_to_exit_code(pipeline_err).into(),
            None => ExitCode::Error.into(),
        },
    }
}
