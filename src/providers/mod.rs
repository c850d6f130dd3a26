//! External product data providers
//!
//! Every provider implements the same thin contract: given a barcode, return
//! a normalized partial `ProductRecord`, `None` for "not found", or an error.
//! Provider-specific payload shapes are normalized here at the adapter
//! boundary so fusion and scoring stay strictly typed.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProductRecord;

pub mod food_standards;
pub mod open_food_facts;
pub mod registry;
pub mod retailer;
pub mod upc_lookup;
pub mod web_search;

pub use registry::ProviderRegistry;

/// Provider call errors
///
/// Rate limiting is a distinguished case so the dispatcher can apply backoff
/// only then; everything else is recovered locally as "no answer".
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider rate limited")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider call timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Broad class of a data source, used for default weighting and for the
/// scoring sufficiency gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    /// Government / official food-standards source
    Official,
    /// Community-maintained open database
    Community,
    /// Retailer product API
    Retailer,
    /// Generic barcode lookup API
    Lookup,
    /// Best-effort web search
    WebSearch,
    /// Anything we have no registration for
    Unknown,
}

impl SourceClass {
    /// Default fusion weight for a source of this class
    pub fn default_weight(self) -> f64 {
        match self {
            SourceClass::Official => 0.40,
            SourceClass::Community => 0.35,
            SourceClass::Retailer => 0.25,
            SourceClass::Lookup => 0.15,
            SourceClass::WebSearch => 0.10,
            SourceClass::Unknown => 0.10,
        }
    }
}

/// Classify a provider id into its source class
pub fn source_class(source: &str) -> SourceClass {
    match source {
        "fsanz" => SourceClass::Official,
        "openfoodfacts" => SourceClass::Community,
        "retailer" => SourceClass::Retailer,
        "upcitemdb" => SourceClass::Lookup,
        "web_search" => SourceClass::WebSearch,
        _ => SourceClass::Unknown,
    }
}

/// Uniform provider adapter contract
///
/// Implementations must not error on "not found" (return `Ok(None)`), must
/// signal rate limiting via `ProviderError::RateLimited`, and must tag their
/// partials with their own stable `id()`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier used for weighting and provenance
    fn id(&self) -> &'static str;

    /// Fetch a normalized partial record for the given barcode
    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>, ProviderError>;
}
