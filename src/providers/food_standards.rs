//! FSANZ food-standards database client
//!
//! Official government source with authoritative nutrition panels. The panel
//! is published per serving, so values are normalized to a per-100g basis
//! here before they enter the model.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::ProductRecord;
use crate::providers::{ProviderAdapter, ProviderError};

const FSANZ_BASE_URL: &str = "https://api.foodstandards.gov.au/products/v1";

#[derive(Debug, Deserialize)]
struct FsanzProduct {
    #[serde(rename = "productName")]
    product_name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    #[serde(rename = "countryOfOrigin")]
    country_of_origin: Option<String>,
    #[serde(rename = "ingredientStatement")]
    ingredient_statement: Option<String>,
    #[serde(rename = "allergenStatement", default)]
    allergens: Vec<String>,
    #[serde(rename = "servingSizeGrams")]
    serving_size_grams: Option<f64>,
    #[serde(rename = "nutritionPanel", default)]
    nutrition_panel: Vec<FsanzNutrient>,
}

#[derive(Debug, Deserialize)]
struct FsanzNutrient {
    key: String,
    #[serde(rename = "perServing")]
    per_serving: Option<f64>,
    #[serde(rename = "per100g")]
    per_100g: Option<f64>,
}

/// FSANZ product database client
pub struct FoodStandardsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl FoodStandardsClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: FSANZ_BASE_URL.to_string(),
        })
    }

    fn normalize(&self, barcode: &str, product: FsanzProduct) -> ProductRecord {
        let mut record = ProductRecord::partial(barcode, "fsanz");

        record.name = product.product_name.filter(|n| !n.trim().is_empty());
        record.brand = product.brand.filter(|b| !b.trim().is_empty());
        record.category = product.category;
        record.origin = product.country_of_origin;
        record.ingredients_text = product
            .ingredient_statement
            .filter(|i| !i.trim().is_empty());
        record.allergen_tags = product
            .allergens
            .into_iter()
            .map(|a| a.to_lowercase())
            .collect();
        record.nutriments = normalize_panel(
            &product.nutrition_panel,
            product.serving_size_grams,
        );

        record.completion = record.computed_completion();
        // Authoritative source; quality is high whenever the panel is present
        record.quality = if record.nutriments.is_empty() { 60.0 } else { 90.0 };

        record
    }
}

#[async_trait]
impl ProviderAdapter for FoodStandardsClient {
    fn id(&self) -> &'static str {
        "fsanz"
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        let url = format!("{}/barcode/{}", self.base_url, barcode);

        tracing::debug!(barcode, "Querying FSANZ product database");

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

        let product: FsanzProduct = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(Some(self.normalize(barcode, product)))
    }
}

/// Convert a nutrition panel to per-100g values.
///
/// Per-100g figures are taken as published; per-serving-only figures are
/// scaled by the serving size. A per-serving figure without a serving size
/// cannot be normalized and is dropped.
fn normalize_panel(
    panel: &[FsanzNutrient],
    serving_size_grams: Option<f64>,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();

    for nutrient in panel {
        let key = format!("{}_100g", nutrient.key);
        if let Some(v) = nutrient.per_100g {
            out.insert(key, v);
        } else if let Some(per_serving) = nutrient.per_serving {
            match serving_size_grams {
                Some(serving) if serving > 0.0 => {
                    out.insert(key, per_serving * 100.0 / serving);
                }
                _ => {
                    tracing::debug!(
                        nutrient = %nutrient.key,
                        "Dropping per-serving nutrient with unknown serving size"
                    );
                }
            }
        }
    }

    out
}
