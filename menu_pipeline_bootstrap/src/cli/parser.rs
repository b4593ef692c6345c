// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived argument structure for the menu pipeline binary. Parsing
//! only; [`super::validator`] applies the security checks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Menu enrichment pipeline: turns a photo of a menu into translated,
/// categorized, enriched line items.
#[derive(Debug, Parser)]
#[command(name = "menu-pipeline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a configuration file, overriding the default search path.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the long-lived service: accepts image uploads, runs the
    /// coordinator and enrichment dispatcher, and serves the SSE gateway.
    Serve {
        /// Address to bind the HTTP/SSE listener to.
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind_addr: String,
    },
    /// Process a single menu image end-to-end and exit.
    Process {
        /// Path to the menu photo.
        image: PathBuf,

        /// Session identifier to use; a fresh one is generated if omitted.
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Configuration-related subcommands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Load configuration, validate it, and exit without starting anything.
    Check,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_with_session_id() {
        let cli = Cli::parse_from(["menu-pipeline", "process", "menu.jpg", "--session-id", "abc12345"]);
        match cli.command {
            Commands::Process { image, session_id } => {
                assert_eq!(image, PathBuf::from("menu.jpg"));
                assert_eq!(session_id.as_deref(), Some("abc12345"));
            }
            other => panic!("expected Process, got {other:?}"),
        }
    }

    #[test]
    fn parses_serve_with_default_bind_addr() {
        let cli = Cli::parse_from(["menu-pipeline", "serve"]);
        match cli.command {
            Commands::Serve { bind_addr } => assert_eq!(bind_addr, "0.0.0.0:8080"),
            other => panic!("expected Serve, got {other:?}"),
        }
    }

    #[test]
    fn parses_config_check() {
        let cli = Cli::parse_from(["menu-pipeline", "config", "check"]);
        assert!(matches!(cli.command, Commands::Config { action: ConfigAction::Check }));
    }
}
