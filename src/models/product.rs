//! Canonical fused product representation
//!
//! A `ProductRecord` is constructed fresh per resolution request from zero or
//! more provider partials, enriched by fusion, stamped by scoring, and
//! persisted by the cache with a derived expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::recall::RecallEntry;

/// A certification mark carried by a product (e.g. organic, fair trade)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    /// Stable tag used for deduplication across sources (e.g. "fairtrade")
    pub tag: String,
    /// Human-readable display name (e.g. "Fairtrade International")
    pub label: String,
}

/// Palm oil provenance as reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PalmOilStatus {
    /// No palm oil in the product
    Free,
    /// Palm oil from a certified sustainable supply chain
    CertifiedSustainable,
    /// Confirmed non-sustainable palm oil
    NonSustainable,
}

/// Recyclability of the product's packaging components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackagingRecycling {
    /// Every packaging component is marked recyclable
    Full,
    /// At least one, but not all, components are recyclable
    Partial,
    /// No recyclable components
    NotRecyclable,
}

/// Four-pillar trust score breakdown
///
/// Each pillar is independently clamped to [0, 25]; the composite score is
/// their sum. `nutrition_score` and `environment_score` are legacy
/// 0-100-normalized aliases of the body and planet pillars kept for display
/// compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub body: f64,
    pub planet: f64,
    pub care: f64,
    pub open: f64,
    /// Legacy alias: body pillar normalized to 0-100
    pub nutrition_score: u8,
    /// Legacy alias: planet pillar normalized to 0-100
    pub environment_score: u8,
    /// Ordered human-readable rationale, derived from the same inputs as the
    /// numeric pillars
    pub rationale: Vec<String>,
}

/// Canonical fused product record
///
/// Nutrient values are always per-100-unit; serving-relative provider values
/// are normalized at the adapter boundary before entering this model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Scanned identifier; never overwritten after first assignment
    pub barcode: String,

    // Descriptive fields: last-writer-wins by source weight during fusion
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub quantity: Option<String>,
    pub packaging: Option<String>,
    pub origin: Option<String>,

    /// Full ingredient text; resolved to the longest candidate during fusion
    pub ingredients_text: Option<String>,

    /// Sparse nutrient-key -> per-100-unit value mapping. Keys are an open
    /// set since provider nutrient coverage varies.
    #[serde(default)]
    pub nutriments: BTreeMap<String, f64>,

    /// Certification marks, unioned across sources by tag
    #[serde(default)]
    pub certifications: Vec<Certification>,

    // Scoring inputs
    pub nutriscore_grade: Option<String>,
    pub ecoscore_grade: Option<String>,
    pub nova_group: Option<u8>,
    #[serde(default)]
    pub additive_tags: Vec<String>,
    #[serde(default)]
    pub ingredient_analysis_tags: Vec<String>,
    #[serde(default)]
    pub allergen_tags: Vec<String>,
    pub palm_oil: Option<PalmOilStatus>,
    pub packaging_recycling: Option<PackagingRecycling>,

    // Provenance
    /// Highest-weight contributing provider id
    pub source: String,
    /// Self-reported or heuristic data quality, 0-100; recomputed by fusion
    pub quality: f64,
    /// Self-reported or heuristic completeness, 0-100; recomputed by fusion
    pub completion: f64,

    // Derived
    /// Composite trust score, present iff the record passed the sufficiency
    /// gate; explicitly None otherwise, never a placeholder number
    pub trust_score: Option<u8>,
    pub score_breakdown: Option<ScoreBreakdown>,

    /// Safety recalls, attached asynchronously and non-authoritatively
    pub recalls: Option<Vec<RecallEntry>>,
}

impl ProductRecord {
    /// Create an empty partial for the given barcode and source
    pub fn partial(barcode: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            name: None,
            brand: None,
            category: None,
            description: None,
            image_url: None,
            quantity: None,
            packaging: None,
            origin: None,
            ingredients_text: None,
            nutriments: BTreeMap::new(),
            certifications: Vec::new(),
            nutriscore_grade: None,
            ecoscore_grade: None,
            nova_group: None,
            additive_tags: Vec::new(),
            ingredient_analysis_tags: Vec::new(),
            allergen_tags: Vec::new(),
            palm_oil: None,
            packaging_recycling: None,
            source: source.into(),
            quality: 0.0,
            completion: 0.0,
            trust_score: None,
            score_breakdown: None,
            recalls: None,
        }
    }

    /// Whether the partial carries any usable signal at all
    pub fn has_any_data(&self) -> bool {
        self.name.is_some()
            || self.brand.is_some()
            || self.image_url.is_some()
            || !self.nutriments.is_empty()
            || self.ingredients_text.is_some()
    }

    /// True when the name is missing or is just the barcode echoed back
    pub fn has_placeholder_name(&self) -> bool {
        match &self.name {
            None => true,
            Some(name) => {
                let trimmed = name.trim();
                trimmed.is_empty() || trimmed == self.barcode
            }
        }
    }

    /// Heuristic completeness from filled-field coverage, 0-100
    pub fn computed_completion(&self) -> f64 {
        let filled = [
            self.name.is_some(),
            self.brand.is_some(),
            self.category.is_some(),
            self.image_url.is_some(),
            self.quantity.is_some(),
            self.origin.is_some(),
            self.ingredients_text.is_some(),
            !self.nutriments.is_empty(),
        ]
        .iter()
        .filter(|f| **f)
        .count();

        filled as f64 / 8.0 * 100.0
    }
}

/// A cached resolution result with its derived expiry
///
/// Immutable from the cache's point of view: enrichment (e.g. recalls)
/// replaces the whole entry, never mutates it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub record: ProductRecord,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Caller service tier the entry was written under
    pub premium: bool,
}
