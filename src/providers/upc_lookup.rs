//! UPCitemdb lookup client
//!
//! Generic barcode lookup API. Descriptive fields only, no nutrition data;
//! useful as a second generalist answer for fusion.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::ProductRecord;
use crate::providers::{ProviderAdapter, ProviderError};

const UPCITEMDB_BASE_URL: &str = "https://api.upcitemdb.com/prod/trial/lookup";

#[derive(Debug, Deserialize)]
struct UpcResponse {
    #[serde(default)]
    items: Vec<UpcItem>,
}

#[derive(Debug, Deserialize)]
struct UpcItem {
    title: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    description: Option<String>,
    size: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

/// UPCitemdb API client
pub struct UpcLookupClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpcLookupClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: UPCITEMDB_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for UpcLookupClient {
    fn id(&self) -> &'static str {
        "upcitemdb"
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        tracing::debug!(barcode, "Querying UPCitemdb");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("upc", barcode)])
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

        let body: UpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let Some(item) = body.items.into_iter().next() else {
            return Ok(None);
        };

        let mut record = ProductRecord::partial(barcode, "upcitemdb");
        record.name = item.title.filter(|t| !t.trim().is_empty());
        record.brand = item.brand.filter(|b| !b.trim().is_empty());
        record.category = item.category;
        record.description = item.description;
        record.quantity = item.size;
        record.image_url = item.images.into_iter().next();

        record.completion = record.computed_completion();
        // Descriptive-only aggregator, no review process
        record.quality = 40.0;

        Ok(Some(record))
    }
}
