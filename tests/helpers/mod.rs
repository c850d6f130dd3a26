//! Shared test fixtures: mock providers, recall sources, and a fully wired
//! resolver backed by the in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use shelfscore::cache::{CachePolicy, MemoryStore, ProductCache};
use shelfscore::cache::store::BlobStore;
use shelfscore::fusion::default_weight_table;
use shelfscore::models::{ProductRecord, RecallEntry};
use shelfscore::pipeline::Resolver;
use shelfscore::providers::{ProviderAdapter, ProviderError};
use shelfscore::services::{
    ImageCacher, ProviderLimits, RateLimitedDispatcher, RecallChecker, RecallSource, Tier,
    TieredOrchestrator,
};

/// Scripted provider adapter with a call counter
pub struct MockProvider {
    pub id: &'static str,
    pub response: Result<Option<ProductRecord>, ProviderError>,
    pub calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn returning(id: &'static str, record: ProductRecord) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Self {
            id,
            response: Ok(Some(record)),
            calls: Arc::clone(&calls),
        });
        (provider, calls)
    }

    pub fn not_found(id: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Self {
            id,
            response: Ok(None),
            calls: Arc::clone(&calls),
        });
        (provider, calls)
    }

    pub fn failing(id: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Self {
            id,
            response: Err(ProviderError::Network("connection refused".to_string())),
            calls: Arc::clone(&calls),
        });
        (provider, calls)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn fetch(&self, _barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Recall source that never finds anything
pub struct NoRecalls;

#[async_trait]
impl RecallSource for NoRecalls {
    async fn check_recalls(
        &self,
        _name: Option<&str>,
        _brand: Option<&str>,
        _barcode: Option<&str>,
    ) -> Result<Vec<RecallEntry>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Recall source that always returns the given notices
pub struct FixedRecalls(pub Vec<RecallEntry>);

#[async_trait]
impl RecallSource for FixedRecalls {
    async fn check_recalls(
        &self,
        _name: Option<&str>,
        _brand: Option<&str>,
        _barcode: Option<&str>,
    ) -> Result<Vec<RecallEntry>, ProviderError> {
        Ok(self.0.clone())
    }
}

/// A reasonably complete record as a generalist provider would return it
pub fn full_record(barcode: &str, source: &str) -> ProductRecord {
    let mut record = ProductRecord::partial(barcode, source);
    record.name = Some("Rolled Oats".to_string());
    record.brand = Some("Hilltop Farm".to_string());
    record.image_url = Some("https://images.example.com/oats.jpg".to_string());
    record.ingredients_text = Some("wholegrain oats".to_string());
    record.nutriments.insert("energy_100g".to_string(), 1500.0);
    record.quality = 80.0;
    record.completion = 75.0;
    record
}

/// Wire a resolver over mock tiers, the in-memory store, and a recall source
pub fn build_resolver(
    tiers: Vec<Tier>,
    recall_source: Arc<dyn RecallSource>,
) -> (Arc<Resolver>, Arc<ProductCache>) {
    // Generous limits so tests never sit in pacing sleeps
    let mut limits = HashMap::new();
    for tier in &tiers {
        for provider in &tier.providers {
            limits.insert(
                provider.id().to_string(),
                ProviderLimits {
                    requests_per_second: 100.0,
                    ..ProviderLimits::default()
                },
            );
        }
    }

    let dispatcher = Arc::new(RateLimitedDispatcher::new(limits));
    let orchestrator = Arc::new(TieredOrchestrator::new(
        tiers,
        dispatcher,
        Duration::from_secs(5),
    ));

    let cache = Arc::new(ProductCache::new(
        Arc::new(MemoryStore::new()),
        CachePolicy::default(),
    ));
    let recall_checker = Arc::new(RecallChecker::new(recall_source, Duration::from_millis(500)));
    let blobs = Arc::new(BlobStore::new(std::env::temp_dir().join("shelfscore-test-blobs")));
    let image_cacher = Arc::new(ImageCacher::new(
        "shelfscore-test",
        Duration::from_secs(1),
        Arc::clone(&blobs),
    ));

    let resolver = Arc::new(Resolver::new(
        orchestrator,
        default_weight_table(),
        Arc::clone(&cache),
        recall_checker,
        image_cacher,
    ));

    (resolver, cache)
}
