//! Provider registry
//!
//! Builds the tier ladder and the per-provider rate limits from service
//! configuration. Tier membership is fixed; only endpoints and timeouts come
//! from config.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::providers::food_standards::FoodStandardsClient;
use crate::providers::open_food_facts::OpenFoodFactsClient;
use crate::providers::retailer::RetailerClient;
use crate::providers::upc_lookup::UpcLookupClient;
use crate::providers::web_search::WebSearchClient;
use crate::providers::{ProviderAdapter, ProviderError};
use crate::services::{ProviderLimits, Tier, TierPolicy};

pub struct ProviderRegistry {
    pub tiers: Vec<Tier>,
    pub limits: HashMap<String, ProviderLimits>,
}

impl ProviderRegistry {
    /// Assemble all adapters into the four-tier ladder.
    ///
    /// Tier 1 collects from the broad generalist sources, tier 2 is the
    /// official food-standards register, tier 3 the retailer catalogue, and
    /// tier 4 the web-search fallback that always produces at least a stub.
    pub fn build(config: &ServiceConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.provider_timeout_ms);
        let agent = &config.user_agent;

        let off = Arc::new(OpenFoodFactsClient::new(agent, timeout)?);
        let upc = Arc::new(UpcLookupClient::new(agent, timeout)?);
        let fsanz = Arc::new(FoodStandardsClient::new(agent, timeout)?);
        let retailer = Arc::new(RetailerClient::new(
            config.retailer_base_url.clone(),
            agent,
            timeout,
        )?);
        let web = Arc::new(WebSearchClient::new(agent, timeout));

        let tiers = vec![
            Tier {
                name: "generalist",
                policy: TierPolicy::CollectAll,
                providers: vec![off as Arc<dyn ProviderAdapter>, upc],
            },
            Tier {
                name: "official",
                policy: TierPolicy::CollectAll,
                providers: vec![fsanz],
            },
            Tier {
                name: "retailer",
                policy: TierPolicy::FirstMatch,
                providers: vec![retailer],
            },
            Tier {
                name: "web_search",
                policy: TierPolicy::FirstMatch,
                providers: vec![web],
            },
        ];

        Ok(Self {
            tiers,
            limits: default_limits(),
        })
    }
}

/// Published or observed rate limits per upstream
fn default_limits() -> HashMap<String, ProviderLimits> {
    let mut limits = HashMap::new();
    // Open Food Facts asks for no more than 100 req/min on product reads
    limits.insert(
        "openfoodfacts".to_string(),
        ProviderLimits {
            requests_per_second: 1.5,
            max_in_flight: 4,
            ..ProviderLimits::default()
        },
    );
    // upcitemdb free tier is tight; stay well under it
    limits.insert(
        "upcitemdb".to_string(),
        ProviderLimits {
            requests_per_second: 0.5,
            max_in_flight: 2,
            ..ProviderLimits::default()
        },
    );
    limits.insert(
        "fsanz".to_string(),
        ProviderLimits {
            requests_per_second: 1.0,
            max_in_flight: 2,
            ..ProviderLimits::default()
        },
    );
    limits.insert(
        "retailer".to_string(),
        ProviderLimits {
            requests_per_second: 2.0,
            max_in_flight: 4,
            ..ProviderLimits::default()
        },
    );
    limits.insert(
        "web_search".to_string(),
        ProviderLimits {
            requests_per_second: 1.0,
            max_in_flight: 2,
            ..ProviderLimits::default()
        },
    );
    limits
}
