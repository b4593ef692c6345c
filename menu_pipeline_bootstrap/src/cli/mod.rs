// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands, ConfigAction};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: every argument has passed clap's type
/// checking and [`SecureArgParser`]'s injection/traversal checks.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve { bind_addr: String },
    Process { image: PathBuf, session_id: Option<String> },
    ConfigCheck,
}

/// Parses CLI arguments with clap, then applies security validation.
///
/// # Errors
///
/// Returns [`ParseError`] if parsing or validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let command = match cli.command {
        Commands::Serve { bind_addr } => {
            SecureArgParser::validate_argument(&bind_addr)?;
            ValidatedCommand::Serve { bind_addr }
        }
        Commands::Process { image, session_id } => {
            let validated_image = SecureArgParser::validate_path(&image.to_string_lossy())?;
            if let Some(ref sid) = session_id {
                SecureArgParser::validate_argument(sid)?;
            }
            ValidatedCommand::Process { image: validated_image, session_id }
        }
        Commands::Config { action: ConfigAction::Check } => ValidatedCommand::ConfigCheck,
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config })
}
