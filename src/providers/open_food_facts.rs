//! Open Food Facts API client
//!
//! Community open database; the canonical generalist source. Payload fields
//! are normalized into the `ProductRecord` partial shape here.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::models::{Certification, PackagingRecycling, PalmOilStatus, ProductRecord};
use crate::providers::{ProviderAdapter, ProviderError};

const OFF_BASE_URL: &str = "https://world.openfoodfacts.org/api/v2/product";

/// Open Food Facts lookup response
#[derive(Debug, Deserialize)]
struct OffResponse {
    status: u8,
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    product_name: Option<String>,
    brands: Option<String>,
    categories: Option<String>,
    generic_name: Option<String>,
    image_url: Option<String>,
    quantity: Option<String>,
    packaging: Option<String>,
    origins: Option<String>,
    ingredients_text: Option<String>,
    #[serde(default)]
    nutriments: HashMap<String, serde_json::Value>,
    nutriscore_grade: Option<String>,
    ecoscore_grade: Option<String>,
    nova_group: Option<u8>,
    #[serde(default)]
    additives_tags: Vec<String>,
    #[serde(default)]
    ingredients_analysis_tags: Vec<String>,
    #[serde(default)]
    allergens_tags: Vec<String>,
    #[serde(default)]
    labels_tags: Vec<String>,
    /// Fraction of the product page filled in, 0.0-1.0
    completeness: Option<f64>,
    #[serde(default)]
    packagings: Vec<OffPackaging>,
}

#[derive(Debug, Deserialize)]
struct OffPackaging {
    recycling: Option<String>,
}

/// Open Food Facts API client
pub struct OpenFoodFactsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: OFF_BASE_URL.to_string(),
        })
    }

    fn normalize(&self, barcode: &str, product: OffProduct) -> ProductRecord {
        let mut record = ProductRecord::partial(barcode, "openfoodfacts");

        record.name = non_empty(product.product_name);
        record.brand = non_empty(product.brands);
        record.category = non_empty(product.categories);
        record.description = non_empty(product.generic_name);
        record.image_url = non_empty(product.image_url);
        record.quantity = non_empty(product.quantity);
        record.packaging = non_empty(product.packaging);
        record.origin = non_empty(product.origins);
        record.ingredients_text = non_empty(product.ingredients_text);
        record.nutriments = normalize_nutriments(&product.nutriments);
        record.nutriscore_grade = non_empty(product.nutriscore_grade);
        record.ecoscore_grade = non_empty(product.ecoscore_grade);
        record.nova_group = product.nova_group;
        record.additive_tags = strip_lang_prefix(product.additives_tags);
        record.ingredient_analysis_tags = strip_lang_prefix(product.ingredients_analysis_tags);
        record.allergen_tags = strip_lang_prefix(product.allergens_tags);
        record.certifications = certifications_from_labels(&product.labels_tags);
        record.palm_oil = palm_oil_from_analysis(&record.ingredient_analysis_tags);
        record.packaging_recycling = recycling_from_packagings(&product.packagings);

        record.completion = product
            .completeness
            .map(|c| (c * 100.0).clamp(0.0, 100.0))
            .unwrap_or_else(|| record.computed_completion());
        // Community data with editorial review; quality tracks completeness
        record.quality = (50.0 + record.completion / 2.0).clamp(0.0, 100.0);

        record
    }
}

#[async_trait]
impl ProviderAdapter for OpenFoodFactsClient {
    fn id(&self) -> &'static str {
        "openfoodfacts"
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        let url = format!("{}/{}.json", self.base_url, barcode);

        tracing::debug!(barcode, url = %url, "Querying Open Food Facts");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await?;

        let status = response.status();

        if status == 404 {
            return Ok(None);
        }

        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        let body: OffResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if body.status == 0 {
            return Ok(None);
        }

        let Some(product) = body.product else {
            return Ok(None);
        };

        let record = self.normalize(barcode, product);

        tracing::info!(
            barcode,
            name = record.name.as_deref().unwrap_or("-"),
            completion = record.completion,
            "Retrieved product from Open Food Facts"
        );

        Ok(Some(record))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keep only per-100-unit nutrient keys; serving-relative values without a
/// known serving size never enter the model.
fn normalize_nutriments(raw: &HashMap<String, serde_json::Value>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        if key.ends_with("_serving") || key.ends_with("_unit") || key.ends_with("_value") {
            continue;
        }
        if let Some(v) = value.as_f64() {
            out.insert(key.clone(), v);
        }
    }
    out
}

/// Strip the "en:" style language prefix Open Food Facts puts on tags
fn strip_lang_prefix(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| match t.split_once(':') {
            Some((prefix, rest)) if prefix.len() == 2 => rest.to_string(),
            _ => t,
        })
        .collect()
}

fn certifications_from_labels(labels: &[String]) -> Vec<Certification> {
    const KNOWN: &[(&str, &str, &str)] = &[
        ("fair-trade", "fairtrade", "Fairtrade"),
        ("fairtrade", "fairtrade", "Fairtrade"),
        ("organic", "organic", "Certified Organic"),
        ("rainforest-alliance", "rainforest-alliance", "Rainforest Alliance"),
        ("sustainable-seafood-msc", "msc", "Marine Stewardship Council"),
        ("asc", "asc", "Aquaculture Stewardship Council"),
        ("vegan", "vegan", "Vegan"),
        ("cruelty-free", "cruelty-free", "Cruelty Free"),
        ("animal-welfare", "animal-welfare", "Animal Welfare Approved"),
    ];

    let mut certs: Vec<Certification> = Vec::new();
    for label in labels {
        let bare = label.split_once(':').map(|(_, rest)| rest).unwrap_or(label);
        for (needle, tag, display) in KNOWN {
            if bare.contains(needle) && !certs.iter().any(|c| c.tag == *tag) {
                certs.push(Certification {
                    tag: (*tag).to_string(),
                    label: (*display).to_string(),
                });
            }
        }
    }
    certs
}

fn palm_oil_from_analysis(tags: &[String]) -> Option<PalmOilStatus> {
    // "non-sustainable-palm-oil" contains "sustainable-palm-oil", so the
    // negative form must be tested first
    if tags.iter().any(|t| t.contains("palm-oil-free")) {
        Some(PalmOilStatus::Free)
    } else if tags.iter().any(|t| t.contains("non-sustainable-palm-oil")) {
        Some(PalmOilStatus::NonSustainable)
    } else if tags.iter().any(|t| t.contains("sustainable-palm-oil")) {
        Some(PalmOilStatus::CertifiedSustainable)
    } else if tags.iter().any(|t| t.contains("palm-oil")) {
        Some(PalmOilStatus::NonSustainable)
    } else {
        None
    }
}

fn recycling_from_packagings(packagings: &[OffPackaging]) -> Option<PackagingRecycling> {
    if packagings.is_empty() {
        return None;
    }
    let recyclable = packagings
        .iter()
        .filter(|p| {
            p.recycling
                .as_deref()
                .is_some_and(|r| r.contains("recycle"))
        })
        .count();

    Some(if recyclable == packagings.len() {
        PackagingRecycling::Full
    } else if recyclable > 0 {
        PackagingRecycling::Partial
    } else {
        PackagingRecycling::NotRecyclable
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_lang_prefix() {
        let tags = vec!["en:e322".to_string(), "e471".to_string()];
        assert_eq!(strip_lang_prefix(tags), vec!["e322", "e471"]);
    }

    #[test]
    fn test_normalize_nutriments_drops_serving_keys() {
        let mut raw = HashMap::new();
        raw.insert("energy_100g".to_string(), serde_json::json!(1500.0));
        raw.insert("energy_serving".to_string(), serde_json::json!(300.0));
        raw.insert("energy_unit".to_string(), serde_json::json!("kJ"));

        let out = normalize_nutriments(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("energy_100g"), Some(&1500.0));
    }

    #[test]
    fn test_palm_oil_classification() {
        let free = vec!["palm-oil-free".to_string()];
        assert_eq!(palm_oil_from_analysis(&free), Some(PalmOilStatus::Free));

        let bad = vec!["palm-oil".to_string()];
        assert_eq!(palm_oil_from_analysis(&bad), Some(PalmOilStatus::NonSustainable));

        let non_sustainable = vec!["en:non-sustainable-palm-oil".to_string()];
        assert_eq!(
            palm_oil_from_analysis(&non_sustainable),
            Some(PalmOilStatus::NonSustainable)
        );

        let sustainable = vec!["en:sustainable-palm-oil".to_string()];
        assert_eq!(
            palm_oil_from_analysis(&sustainable),
            Some(PalmOilStatus::CertifiedSustainable)
        );

        assert_eq!(palm_oil_from_analysis(&[]), None);
    }

    #[test]
    fn test_recycling_classification() {
        let all = vec![
            OffPackaging { recycling: Some("en:recycle".to_string()) },
            OffPackaging { recycling: Some("recycle-in-glass-bin".to_string()) },
        ];
        assert_eq!(recycling_from_packagings(&all), Some(PackagingRecycling::Full));

        let some = vec![
            OffPackaging { recycling: Some("en:recycle".to_string()) },
            OffPackaging { recycling: Some("en:discard".to_string()) },
        ];
        assert_eq!(recycling_from_packagings(&some), Some(PackagingRecycling::Partial));

        assert_eq!(recycling_from_packagings(&[]), None);
    }

    #[test]
    fn test_certifications_deduplicated() {
        let labels = vec![
            "en:organic".to_string(),
            "en:eu-organic".to_string(),
            "en:fair-trade".to_string(),
        ];
        let certs = certifications_from_labels(&labels);
        assert_eq!(certs.iter().filter(|c| c.tag == "organic").count(), 1);
        assert!(certs.iter().any(|c| c.tag == "fairtrade"));
    }
}
