//! # Provider Adapters
//!
//! Pass-through stub implementations of the seven external provider
//! traits declared in [`menu_pipeline_domain::ports`]. See [`stub`] for why
//! no live vendor adapters are fabricated here.

pub mod stub;

pub use stub::{
    PassThroughAllergenProvider, PassThroughCategorizeProvider, PassThroughDescribeProvider,
    PassThroughImageSearchProvider, PassThroughIngredientProvider, PassThroughOcrProvider, PassThroughTranslateProvider,
};
