// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Menu Pipeline Binary
//!
//! The composition root: parses and validates CLI arguments through the
//! bootstrap layer, loads [`menu_pipeline_bootstrap::config::AppConfig`],
//! installs the `tracing` subscriber, then wires the domain ports to
//! concrete adapters and drives one of three subcommands.
//!
//! `serve` and `process` both use the in-memory event bus, lock, and
//! stores by default, matching this codebase's position that the
//! Redis/Postgres adapters are opt-in, swapped in by changing which
//! constructors the composition root calls — not by changing any
//! application-layer code. The HTTP surface that would normally front
//! `serve` is this system's own out-of-scope external collaborator
//! (spec.md §1); `serve` here brings the coordinator, dispatcher, and
//! event-stream gateway up and idles until a shutdown signal, ready for an
//! HTTP layer to be grafted on by a caller outside this crate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use menu_pipeline::application::{BatchConfig, EnrichmentDispatcher, EnrichmentProviders, PipelineCoordinator};
use menu_pipeline::infrastructure::{
    init_tracing, EventStreamGateway, InMemoryDistributedLock, InMemoryEventBus, InMemoryItemStore,
    InMemorySessionStore,
};
use menu_pipeline::infrastructure::providers::{
    PassThroughAllergenProvider, PassThroughCategorizeProvider, PassThroughDescribeProvider,
    PassThroughImageSearchProvider, PassThroughIngredientProvider, PassThroughOcrProvider, PassThroughTranslateProvider,
};
use menu_pipeline_bootstrap::cli::ValidatedCommand;
use menu_pipeline_bootstrap::config::AppConfig;
use menu_pipeline_bootstrap::exit_code::result_to_exit_code;
use menu_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use menu_pipeline_bootstrap::signals::create_signal_handler;
use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::value_objects::SessionId;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let validated_cli = match menu_pipeline_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("argument error: {err}");
            return menu_pipeline_bootstrap::exit_code::ExitCode::UsageError.into();
        }
    };

    let config = match AppConfig::load(validated_cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return menu_pipeline_bootstrap::exit_code::ExitCode::DataError.into();
        }
    };

    init_tracing(config.log_level());

    result_to_exit_code(run(validated_cli.command, &config).await)
}

async fn run(command: ValidatedCommand, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        ValidatedCommand::ConfigCheck => config_check(config),
        ValidatedCommand::Process { image, session_id } => process_one(image, session_id, config).await,
        ValidatedCommand::Serve { bind_addr } => serve(bind_addr, config).await,
    }
}

/// Loads configuration, constructs every provider/store/bus stub, and
/// reports success without starting anything — the operator-facing dry
/// run spec.md's "config check" surface implies.
fn config_check(config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        redis_url = config.redis_url(),
        postgres_url = config.postgres_url(),
        batch_size = config.batch_size(),
        max_concurrent_batches = config.max_concurrent_batches(),
        "configuration is valid"
    );
    println!("configuration OK");
    println!("  redis_url: {}", config.redis_url());
    println!("  postgres_url: {}", config.postgres_url());
    println!("  batch_size: {}", config.batch_size());
    println!("  max_concurrent_batches: {}", config.max_concurrent_batches());
    println!("  lock_ttl: {:?}", config.lock_ttl());
    Ok(())
}

/// Runs one menu photo through the full pipeline against in-memory
/// adapters and pass-through providers, then prints the terminal session
/// status and item count.
async fn process_one(image: std::path::PathBuf, session_id: Option<String>, config: &AppConfig) -> anyhow::Result<()> {
    let image_bytes = std::fs::read(&image).with_context(|| format!("reading menu image at {}", image.display()))?;

    let session_id = match session_id {
        Some(raw) => SessionId::new(raw)?,
        None => SessionId::generate(),
    };

    let coordinator = build_coordinator(config);
    coordinator.process_menu_image(session_id.clone(), image_bytes).await?;

    println!("session {session_id} finished processing");
    Ok(())
}

/// Brings the coordinator, dispatcher, and event-stream gateway up and
/// idles until SIGTERM/SIGINT/SIGHUP, per the bootstrap layer's graceful
/// shutdown contract. Does not bind `bind_addr` itself — an HTTP front end
/// is this system's own external collaborator (spec.md §1) and lives
/// outside this crate; logging the bind address here documents where that
/// layer would attach.
async fn serve(bind_addr: String, config: &AppConfig) -> anyhow::Result<()> {
    let _coordinator = build_coordinator(config);
    let gateway = Arc::new(EventStreamGateway::new());
    tracing::info!(bind_addr, active_connections = gateway.active_connections(), "composition root ready; waiting for an HTTP front end to attach");

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(30));
    let token = shutdown.token();
    let signal_handler = create_signal_handler();
    let waiter = tokio::spawn(async move {
        signal_handler.wait_for_signal(Box::new(move || token.cancel())).await;
    });

    shutdown.token().cancelled().await;
    shutdown.initiate_shutdown();
    shutdown.complete_shutdown();
    let _ = waiter.await;
    Ok(())
}

fn build_coordinator(config: &AppConfig) -> PipelineCoordinator {
    let session_store = Arc::new(InMemorySessionStore::new());
    let item_store = Arc::new(InMemoryItemStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let lock = Arc::new(InMemoryDistributedLock::new());

    let batch_config = BatchConfig {
        batch_size: config.batch_size(),
        max_concurrent: config.max_concurrent_batches(),
        lock_ttl: config.lock_ttl(),
        lock_timeout: Duration::from_secs(10),
        lock_retry_delay: config.lock_retry_interval(),
        max_retries: 3,
    };

    let providers = EnrichmentProviders {
        translate: Arc::new(PassThroughTranslateProvider),
        describe: Arc::new(PassThroughDescribeProvider),
        allergen: Arc::new(PassThroughAllergenProvider),
        ingredient: Arc::new(PassThroughIngredientProvider),
        image_search: Arc::new(PassThroughImageSearchProvider),
    };

    let dispatcher = Arc::new(EnrichmentDispatcher::new(item_store.clone(), bus.clone(), lock, providers, batch_config));

    PipelineCoordinator::new(
        session_store,
        item_store,
        bus,
        Arc::new(PassThroughOcrProvider),
        Arc::new(PassThroughCategorizeProvider),
        dispatcher,
    )
}
