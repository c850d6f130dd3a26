//! Retailer product API client
//!
//! Fallback-tier source backed by a grocery retailer's public catalogue. The
//! endpoint is configurable since the catalogue host differs per deployment
//! region.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::ProductRecord;
use crate::providers::{ProviderAdapter, ProviderError};

#[derive(Debug, Deserialize)]
struct RetailerProduct {
    name: Option<String>,
    brand: Option<String>,
    #[serde(rename = "packageSize")]
    package_size: Option<String>,
    description: Option<String>,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(rename = "ingredients")]
    ingredients: Option<String>,
}

/// Retailer catalogue client
pub struct RetailerClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RetailerClient {
    pub fn new(
        base_url: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait]
impl ProviderAdapter for RetailerClient {
    fn id(&self) -> &'static str {
        "retailer"
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        let url = format!("{}/products/barcode/{}", self.base_url, barcode);

        tracing::debug!(barcode, "Querying retailer catalogue");

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

        let product: RetailerProduct = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let mut record = ProductRecord::partial(barcode, "retailer");
        record.name = product.name.filter(|n| !n.trim().is_empty());
        record.brand = product.brand.filter(|b| !b.trim().is_empty());
        record.quantity = product.package_size;
        record.description = product.description;
        record.image_url = product.image_url;
        record.ingredients_text = product.ingredients.filter(|i| !i.trim().is_empty());

        record.completion = record.computed_completion();
        record.quality = 55.0;

        Ok(Some(record))
    }
}
