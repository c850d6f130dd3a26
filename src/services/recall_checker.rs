//! Safety recall side channel
//!
//! Best-effort, non-blocking enrichment: the checker races the recall source
//! against a short deadline and settles for an empty list on timeout or
//! failure. It never blocks or fails the primary resolution path.

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::RecallEntry;
use crate::providers::ProviderError;

/// Recall data source contract
///
/// Must be safe to call with partial arguments and must return an empty list,
/// not an error, when nothing is found.
#[async_trait]
pub trait RecallSource: Send + Sync {
    async fn check_recalls(
        &self,
        name: Option<&str>,
        brand: Option<&str>,
        barcode: Option<&str>,
    ) -> Result<Vec<RecallEntry>, ProviderError>;
}

/// Deadline-bounded wrapper around a recall source
pub struct RecallChecker {
    source: Arc<dyn RecallSource>,
    deadline: Duration,
}

impl RecallChecker {
    pub fn new(source: Arc<dyn RecallSource>, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    /// Check for recalls, returning an empty list on timeout or failure
    pub async fn check(
        &self,
        name: Option<&str>,
        brand: Option<&str>,
        barcode: Option<&str>,
    ) -> Vec<RecallEntry> {
        match tokio::time::timeout(
            self.deadline,
            self.source.check_recalls(name, brand, barcode),
        )
        .await
        {
            Ok(Ok(recalls)) => recalls,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Recall check failed, continuing without recalls");
                Vec::new()
            }
            Err(_) => {
                tracing::debug!("Recall check timed out, continuing without recalls");
                Vec::new()
            }
        }
    }
}

const RECALL_FEED_URL: &str = "https://www.foodstandards.gov.au/api/recalls/v1/current";

#[derive(Debug, Deserialize)]
struct RecallFeed {
    #[serde(default)]
    recalls: Vec<RecallNotice>,
}

#[derive(Debug, Deserialize)]
struct RecallNotice {
    title: String,
    #[serde(rename = "productName")]
    product_name: Option<String>,
    brand: Option<String>,
    barcode: Option<String>,
    hazard: Option<String>,
    published: Option<String>,
    url: Option<String>,
}

/// Government food recall feed client
pub struct FoodRecallClient {
    http_client: reqwest::Client,
    feed_url: String,
}

impl FoodRecallClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            feed_url: RECALL_FEED_URL.to_string(),
        })
    }

    fn matches(notice: &RecallNotice, name: Option<&str>, brand: Option<&str>, barcode: Option<&str>) -> bool {
        if let (Some(wanted), Some(found)) = (barcode, notice.barcode.as_deref()) {
            if wanted == found {
                return true;
            }
        }
        let name_match = match (name, notice.product_name.as_deref()) {
            (Some(wanted), Some(found)) => {
                found.to_lowercase().contains(&wanted.to_lowercase())
            }
            _ => false,
        };
        let brand_match = match (brand, notice.brand.as_deref()) {
            (Some(wanted), Some(found)) => {
                found.to_lowercase().contains(&wanted.to_lowercase())
            }
            _ => false,
        };
        // Each supplied field must match; a brand-only query matches on
        // brand alone.
        match (name, brand) {
            (Some(_), Some(_)) => name_match && brand_match,
            (Some(_), None) => name_match,
            (None, Some(_)) => brand_match,
            (None, None) => false,
        }
    }
}

#[async_trait]
impl RecallSource for FoodRecallClient {
    async fn check_recalls(
        &self,
        name: Option<&str>,
        brand: Option<&str>,
        barcode: Option<&str>,
    ) -> Result<Vec<RecallEntry>, ProviderError> {
        if name.is_none() && brand.is_none() && barcode.is_none() {
            return Ok(Vec::new());
        }

        let response = self
            .http_client
            .get(&self.feed_url)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let feed: RecallFeed = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let entries = feed
            .recalls
            .into_iter()
            .filter(|n| Self::matches(n, name, brand, barcode))
            .map(|n| RecallEntry {
                title: n.title,
                authority: "FSANZ".to_string(),
                hazard: n.hazard,
                published: n
                    .published
                    .as_deref()
                    .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                    .map(|d| d.to_utc()),
                url: n.url,
            })
            .collect();

        Ok(entries)
    }
}
