//! # Menu Item Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ItemId, SessionId};

/// The five enrichment fields, progressively populated by independent
/// worker tasks after stage 3 completes. Each is `None` until its task
/// succeeds, and only that task's dimension ever writes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichmentFields {
    pub translation: Option<String>,
    pub category_translation: Option<String>,
    pub description: Option<String>,
    pub allergen_text: Option<String>,
    pub ingredient_text: Option<String>,
    /// JSON-encoded list of `{link, title, thumbnail}` image search hits.
    pub image_search: Option<String>,
}

/// One row of structured data extracted from the categorization stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    id: ItemId,
    session_id: SessionId,
    original_text: String,
    category: String,
    price: String,
    enrichment: EnrichmentFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Creates a new item as stage 3 does: a single unenriched row per
    /// unique (original_text, category) pair.
    pub fn new(session_id: SessionId, original_text: impl Into<String>, category: impl Into<String>, price: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::generate(),
            session_id,
            original_text: original_text.into(),
            category: category.into(),
            price: price.into(),
            enrichment: EnrichmentFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn enrichment(&self) -> &EnrichmentFields {
        &self.enrichment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The dedup key used by stage 3 to silently drop duplicate
    /// (name, category) pairs (invariant 4). Whitespace-trimmed, otherwise
    /// byte-exact (see SPEC_FULL.md Open Question 1).
    pub fn dedup_key(name: &str, category: &str) -> (String, String) {
        (name.trim().to_string(), category.trim().to_string())
    }
}

/// A named partial update to exactly the enrichment fields it carries
/// (invariant 5: all others are preserved byte-identical).
///
/// Each field is `Option<Option<String>>`: the outer `Option` distinguishes
/// "this field is not part of the update" (`None`) from "this field is
/// part of the update" (`Some(_)`); the inner `Option<String>` is the
/// field's own nullability. `search_image`'s serialization rule (spec.md
/// §4.3) can legitimately write a null `image_search` for a zero-hit
/// search, and that write must still overwrite whatever was there before —
/// collapsing both `Option` layers into one would make "not touched" and
/// "touched and written null" indistinguishable.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentUpdate {
    pub translation: Option<String>,
    pub category_translation: Option<String>,
    pub description: Option<String>,
    pub allergen_text: Option<String>,
    pub ingredient_text: Option<String>,
    pub image_search: Option<Option<String>>,
}

impl EnrichmentUpdate {
    pub fn translation(translation: String, category_translation: String) -> Self {
        Self { translation: Some(translation), category_translation: Some(category_translation), ..Default::default() }
    }

    pub fn description(description: String) -> Self {
        Self { description: Some(description), ..Default::default() }
    }

    pub fn allergen(allergen_text: String) -> Self {
        Self { allergen_text: Some(allergen_text), ..Default::default() }
    }

    pub fn ingredient(ingredient_text: String) -> Self {
        Self { ingredient_text: Some(ingredient_text), ..Default::default() }
    }

    pub fn image_search(image_search: Option<String>) -> Self {
        Self { image_search: Some(image_search), ..Default::default() }
    }
}

impl MenuItem {
    /// Applies a partial update in place, touching only the fields named
    /// by `update` and bumping `updated_at`. `image_search` is written
    /// whenever the update names it at all, even when the value itself is
    /// `None` — see [`EnrichmentUpdate`]'s doc comment.
    pub fn apply_enrichment(&mut self, update: EnrichmentUpdate) {
        if update.translation.is_some() {
            self.enrichment.translation = update.translation;
        }
        if update.category_translation.is_some() {
            self.enrichment.category_translation = update.category_translation;
        }
        if update.description.is_some() {
            self.enrichment.description = update.description;
        }
        if update.allergen_text.is_some() {
            self.enrichment.allergen_text = update.allergen_text;
        }
        if update.ingredient_text.is_some() {
            self.enrichment.ingredient_text = update.ingredient_text;
        }
        if let Some(image_search) = update.image_search {
            self.enrichment.image_search = image_search;
        }
        self.updated_at = Utc::now();
    }
}
