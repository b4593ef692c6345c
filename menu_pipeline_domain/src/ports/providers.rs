//! # External Provider Ports
//!
//! Every call out to an OCR engine, an LLM, or a search API goes through one
//! of these traits. Production adapters live in the infrastructure crate;
//! tests and `config check` use the pass-through stub adapters built
//! against the same traits (grounded on the upstream `passthrough`
//! provider pattern — a provider that type-checks against the real
//! contract but returns canned data, so the rest of the pipeline can run
//! without live credentials).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One OCR-detected text record: the raw string plus the center of its
/// bounding box in image-pixel coordinates — exactly the `{ text, x_center,
/// y_center }` shape spec.md §4.1 stage 1 specifies, which is all the
/// spatial mapping stage (grouping by row, sorting within a row) needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrTextBox {
    pub text: String,
    pub x_center: f64,
    pub y_center: f64,
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Extracts every text record found in the given image bytes at the
    /// requested granularity (`"paragraph"`, `"word"`, ...).
    async fn extract_text(&self, image_bytes: &[u8], granularity: &str) -> Result<Vec<OcrTextBox>, PipelineError>;
}

/// One categorized line item emitted by the categorization stage, before
/// any enrichment worker has touched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedLine {
    pub name: String,
    pub category: String,
    pub price: String,
}

#[async_trait]
pub trait CategorizeProvider: Send + Sync {
    /// Groups the stage-2 formatted listing into categorized menu lines
    /// using an LLM, at the requested granularity. `formatted_text` is the
    /// flat, human-readable string stage 2 produced — spec.md §4.1 stage 3
    /// is explicit that the formatter's output, not the raw OCR records, is
    /// what this call consumes.
    async fn categorize(&self, formatted_text: &str, granularity: &str) -> Result<Vec<CategorizedLine>, PipelineError>;
}

#[async_trait]
pub trait TranslateProvider: Send + Sync {
    /// Translates `name` and `category` into the target language, returning
    /// `(translated_name, translated_category)`.
    async fn translate(&self, name: &str, category: &str) -> Result<(String, String), PipelineError>;
}

#[async_trait]
pub trait DescribeProvider: Send + Sync {
    async fn describe(&self, name: &str, category: &str) -> Result<String, PipelineError>;
}

/// Structured allergen findings for one item, per spec.md §6's
/// `extractAllergens` contract. The worker task (not this provider) applies
/// the comma-join / `"None"` / `"Unable to determine"` serialization rule
/// from spec.md §4.3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllergenInfo {
    pub allergens: Vec<String>,
    pub allergen_free: bool,
    pub notes: String,
}

#[async_trait]
pub trait AllergenProvider: Send + Sync {
    async fn extract_allergens(&self, name: &str, category: &str) -> Result<AllergenInfo, PipelineError>;
}

/// Structured ingredient findings for one item, per spec.md §6's
/// `extractIngredients` contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientInfo {
    pub main_ingredients: Vec<String>,
    pub cooking_method: Vec<String>,
    pub cuisine_category: String,
    pub dietary_info: String,
}

#[async_trait]
pub trait IngredientProvider: Send + Sync {
    async fn extract_ingredients(&self, name: &str, category: &str) -> Result<IngredientInfo, PipelineError>;
}

/// One image search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSearchHit {
    pub link: String,
    pub title: String,
    pub thumbnail: String,
}

#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    async fn search(&self, name: &str, category: &str, count: usize) -> Result<Vec<ImageSearchHit>, PipelineError>;
}
