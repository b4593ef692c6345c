//! # Ports
//!
//! Trait boundaries between this domain and the outside world: storage,
//! the event bus, distributed locking, and the seven external providers.
//! Everything here is technology-agnostic; the `menu-pipeline` crate
//! supplies the concrete adapters.

mod distributed_lock;
mod event_bus;
mod item_store;
mod providers;
mod session_store;

pub use distributed_lock::{DistributedLock, LockGuard};
pub use event_bus::{EventPublisher, EventSubscriber};
pub use item_store::ItemStore;
pub use providers::{
    AllergenInfo, AllergenProvider, CategorizeProvider, CategorizedLine, DescribeProvider, ImageSearchHit,
    ImageSearchProvider, IngredientInfo, IngredientProvider, OcrProvider, OcrTextBox, TranslateProvider,
};
pub use session_store::SessionStore;
