// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Menu Enrichment Pipeline
//!
//! Turns a photo of a menu into a structured, enriched set of menu items:
//! OCR extracts raw text, a spatial formatter groups it back into rows, an
//! LLM categorizes the rows into named, priced items, and five independent
//! workers enrich each item with a translation, a description, allergen
//! information, ingredient information, and a representative search image.
//!
//! ## Architecture Overview
//!
//! The pipeline follows Clean Architecture and Domain-Driven Design
//! principles, split across this workspace's three crates:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Bootstrap Layer                          │
//! │  (CLI, process lifecycle, signal handling, shutdown)        │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer (this crate)              │
//! │  (Pipeline Coordinator, Enrichment Dispatcher)               │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (Entities, Value Objects, Ports, Domain Events)             │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer (this crate)              │
//! │  (Redis event bus/lock, Postgres/in-memory stores, SSE       │
//! │   gateway, metrics, provider adapters)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Session
//! A session represents one pipeline run for one uploaded menu image. It
//! owns the stage history (for SSE replay) and the status lifecycle:
//! `Pending -> Processing -> (Completed | Failed)`.
//!
//! ### Stages
//! A session moves through three coordinator-driven stages before items
//! exist at all:
//! - **OCR**: extracts raw text records with their pixel-space position
//! - **Spatial formatting**: groups those records back into rows and
//!   produces a flat, readable listing
//! - **Categorization**: an LLM call turns that listing into named, priced,
//!   categorized menu items, deduplicated by (name, category)
//!
//! ### Enrichment
//! Once items exist, five independent workers — translation, description,
//! allergen, ingredient, and search image — enrich each item concurrently.
//! Each task kind runs as its own bounded-concurrency batch, guarded by a
//! per-(item, field) distributed lock, and reports progress and completion
//! as events on the session's event bus.
//!
//! ## Error Handling
//!
//! Domain and infrastructure failures flow through
//! [`menu_pipeline_domain::error::PipelineError`], a `thiserror` enum with a
//! `category()` classifier the bootstrap binary uses to choose an exit
//! code. `anyhow` is reserved for the binary's own composition-root code.
//!
//! ## Observability
//!
//! Structured logging via `tracing`, process metrics via `prometheus`
//! ([`infrastructure::metrics::PipelineMetrics`]).

pub mod application;
pub mod infrastructure;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

pub use menu_pipeline_domain::{
    EnrichmentFields, EnrichmentUpdate, MenuItem, PipelineError, Session, SessionEvent, SessionStatus,
};

pub use crate::application::{batch_executor::EnrichmentDispatcher, coordinator::PipelineCoordinator};
