//! Guaranteed-response web search adapter
//!
//! Terminal tier: tries a lightweight instant-answer search for the barcode,
//! and when nothing at all is discoverable degrades to a barcode-as-name
//! stub. `fetch` therefore always returns `Ok(Some(..))`, which is what
//! gives the orchestrator its "never a null record" post-condition.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::ProductRecord;
use crate::providers::{ProviderAdapter, ProviderError};

const SEARCH_BASE_URL: &str = "https://api.duckduckgo.com/";

/// Quality/completion attached to a barcode-as-name stub
const STUB_QUALITY: f64 = 10.0;
const STUB_COMPLETION: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: Option<String>,
    #[serde(rename = "AbstractText")]
    abstract_text: Option<String>,
    #[serde(rename = "Image")]
    image: Option<String>,
}

/// Best-effort web search client
pub struct WebSearchClient {
    http_client: Option<reqwest::Client>,
    base_url: String,
}

impl WebSearchClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        // A failed client build only disables the search half; the stub
        // fallback keeps the adapter total.
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .ok();

        if http_client.is_none() {
            tracing::warn!("Web search HTTP client unavailable; stub answers only");
        }

        Self {
            http_client,
            base_url: SEARCH_BASE_URL.to_string(),
        }
    }

    fn stub(&self, barcode: &str) -> ProductRecord {
        let mut record = ProductRecord::partial(barcode, "web_search");
        record.name = Some(barcode.to_string());
        record.quality = STUB_QUALITY;
        record.completion = STUB_COMPLETION;
        record
    }

    async fn search(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        let Some(client) = &self.http_client else {
            return Ok(None);
        };

        let response = client
            .get(&self.base_url)
            .query(&[("q", barcode), ("format", "json"), ("no_html", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let Some(heading) = answer.heading.filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };

        let mut record = ProductRecord::partial(barcode, "web_search");
        record.name = Some(heading);
        record.description = answer.abstract_text.filter(|a| !a.trim().is_empty());
        record.image_url = answer.image.filter(|i| !i.trim().is_empty());
        record.completion = record.computed_completion();
        record.quality = 20.0;

        Ok(Some(record))
    }
}

#[async_trait]
impl ProviderAdapter for WebSearchClient {
    fn id(&self) -> &'static str {
        "web_search"
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        match self.search(barcode).await {
            Ok(Some(record)) => {
                tracing::debug!(barcode, "Web search produced an answer");
                Ok(Some(record))
            }
            Ok(None) => Ok(Some(self.stub(barcode))),
            Err(e) => {
                tracing::debug!(barcode, error = %e, "Web search failed, degrading to stub");
                Ok(Some(self.stub(barcode)))
            }
        }
    }
}
