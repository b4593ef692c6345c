//! # Pass-Through Provider Stubs
//!
//! Grounded on this codebase's own `PassThroughService`: a stage that type-
//! checks against the real contract but leaves data unchanged. Every
//! provider trait gets one of these, so `config check` and the test suite
//! can run the whole pipeline without live OCR/LLM/search credentials.
//! Production deployments wire in real adapters against these same traits
//! instead (an HTTP client against an OCR engine, an LLM API, a search
//! API) — this crate does not fabricate those vendor SDK dependencies, so
//! none are implemented here.

use async_trait::async_trait;

use menu_pipeline_domain::error::PipelineError;
use menu_pipeline_domain::ports::{
    AllergenInfo, AllergenProvider, CategorizeProvider, CategorizedLine, DescribeProvider, ImageSearchHit,
    ImageSearchProvider, IngredientInfo, IngredientProvider, OcrProvider, OcrTextBox, TranslateProvider,
};

pub struct PassThroughOcrProvider;

#[async_trait]
impl OcrProvider for PassThroughOcrProvider {
    async fn extract_text(&self, _image_bytes: &[u8], _granularity: &str) -> Result<Vec<OcrTextBox>, PipelineError> {
        Ok(Vec::new())
    }
}

pub struct PassThroughCategorizeProvider;

#[async_trait]
impl CategorizeProvider for PassThroughCategorizeProvider {
    /// Reads back the raw listing the formatter produced (one `name —
    /// price` line per row) and treats every row as its own uncategorized
    /// item, the simplest behavior that type-checks against the real
    /// contract without an LLM call.
    async fn categorize(&self, formatted_text: &str, _granularity: &str) -> Result<Vec<CategorizedLine>, PipelineError> {
        Ok(formatted_text
            .lines()
            .filter_map(|line| line.strip_prefix("- "))
            .filter_map(|row| row.split_once(" — "))
            .map(|(name, price)| CategorizedLine { name: name.trim().to_string(), category: "Uncategorized".to_string(), price: price.trim().to_string() })
            .collect())
    }
}

/// Leaves name and category untranslated — the literal pass-through case.
pub struct PassThroughTranslateProvider;

#[async_trait]
impl TranslateProvider for PassThroughTranslateProvider {
    async fn translate(&self, name: &str, category: &str) -> Result<(String, String), PipelineError> {
        Ok((name.to_string(), category.to_string()))
    }
}

pub struct PassThroughDescribeProvider;

#[async_trait]
impl DescribeProvider for PassThroughDescribeProvider {
    async fn describe(&self, _name: &str, _category: &str) -> Result<String, PipelineError> {
        Ok(String::new())
    }
}

/// Reports "no data" rather than guessing at allergens — the honest
/// pass-through answer when there is no live allergen model behind it.
pub struct PassThroughAllergenProvider;

#[async_trait]
impl AllergenProvider for PassThroughAllergenProvider {
    async fn extract_allergens(&self, _name: &str, _category: &str) -> Result<AllergenInfo, PipelineError> {
        Ok(AllergenInfo::default())
    }
}

pub struct PassThroughIngredientProvider;

#[async_trait]
impl IngredientProvider for PassThroughIngredientProvider {
    async fn extract_ingredients(&self, _name: &str, _category: &str) -> Result<IngredientInfo, PipelineError> {
        Ok(IngredientInfo::default())
    }
}

pub struct PassThroughImageSearchProvider;

#[async_trait]
impl ImageSearchProvider for PassThroughImageSearchProvider {
    async fn search(&self, _name: &str, _category: &str, _count: usize) -> Result<Vec<ImageSearchHit>, PipelineError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn translate_stub_leaves_text_unchanged() {
        let provider = PassThroughTranslateProvider;
        let (name, category) = provider.translate("寿司", "和食").await.unwrap();
        assert_eq!(name, "寿司");
        assert_eq!(category, "和食");
    }

    #[tokio::test]
    async fn categorize_stub_maps_every_listing_row_to_uncategorized() {
        let provider = PassThroughCategorizeProvider;
        let formatted = "Menu: 1 rows across 1 rows\n\nRow 1: Sushi\n\n- Sushi — ¥500\n";
        let lines = provider.categorize(formatted, "paragraph").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Sushi");
        assert_eq!(lines[0].price, "¥500");
        assert_eq!(lines[0].category, "Uncategorized");
    }
}
