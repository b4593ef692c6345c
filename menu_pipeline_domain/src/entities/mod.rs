//! Entities: objects with identity that persists through state changes.

mod menu_item;
mod session;

pub use menu_item::{EnrichmentFields, EnrichmentUpdate, MenuItem};
pub use session::{Session, SessionStatus, CANONICAL_STAGE_ORDER, STAGE_CATEGORIZE, STAGE_MAPPING, STAGE_OCR};
