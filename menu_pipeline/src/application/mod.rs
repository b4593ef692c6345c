//! # Application Layer
//!
//! Orchestrates the domain layer's entities and port traits into the two
//! use cases the system exposes: running one menu image through the
//! pipeline ([`coordinator::PipelineCoordinator`]), and fanning the
//! resulting items out across five independent enrichment workers
//! ([`batch_executor::EnrichmentDispatcher`]).

pub mod batch_executor;
pub mod coordinator;

pub use batch_executor::{BatchConfig, EnrichmentDispatcher, Providers as EnrichmentProviders};
pub use coordinator::PipelineCoordinator;
