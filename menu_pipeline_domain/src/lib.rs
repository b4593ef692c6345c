//! # Menu Pipeline Domain
//!
//! The domain layer for the menu enrichment pipeline: the core business
//! logic and rules of the system, implemented as Domain-Driven Design (DDD)
//! entities, value objects, events, and port traits. This crate is
//! completely independent of external concerns — Redis, Postgres, LLM
//! providers, and HTTP frameworks belong to the `menu-pipeline` crate, which
//! supplies concrete adapters against the traits defined here.
//!
//! ## Module Structure
//!
//! - [`entities`] — objects with identity that persists through state
//!   changes: [`entities::Session`], [`entities::MenuItem`]
//! - [`value_objects`] — immutable, self-validating types with no identity:
//!   [`value_objects::SessionId`], [`value_objects::ItemId`],
//!   [`value_objects::TaskKind`]
//! - [`events`] — the wire format for session events published on the bus:
//!   [`events::SessionEvent`]
//! - [`ports`] — trait boundaries for storage, the event bus, distributed
//!   locking, and the seven external providers
//! - [`error`] — the domain's error taxonomy: [`error::PipelineError`]
//!
//! ## Domain-Driven Design Concepts
//!
//! ### Entities
//! Have a distinct identity that runs through time and different
//! representations; they can change state while maintaining that identity.
//!
//! - [`entities::Session`]: one pipeline execution for one uploaded menu
//!   image, carrying the status lifecycle, per-stage results, and the item
//!   identifier list
//! - [`entities::MenuItem`]: one categorized line item, progressively
//!   enriched by independent workers after categorization
//!
//! ### Value Objects
//! Immutable, defined entirely by their attributes, self-validating.
//!
//! - [`value_objects::SessionId`], [`value_objects::ItemId`]: type-safe
//!   identifiers
//! - [`value_objects::TaskKind`]: the five enrichment dimensions, modeled as
//!   a closed enum so queue names and event names can never drift
//!
//! ### Ports
//! The seam between this domain and the outside world. Defined here as
//! traits; implemented in the infrastructure layer of the `menu-pipeline`
//! crate. See [`ports`] for the full list.

pub mod entities;
pub mod error;
pub mod events;
pub mod ports;
pub mod value_objects;

pub use entities::{EnrichmentFields, EnrichmentUpdate, MenuItem, Session, SessionStatus};
pub use error::PipelineError;
pub use events::SessionEvent;
pub use value_objects::{ItemId, SessionId, TaskKind};
