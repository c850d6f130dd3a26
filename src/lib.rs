//! shelfscore - Barcode product resolution and trust scoring service
//!
//! Resolves retail barcodes against a tiered ladder of product data
//! providers, fuses the partial records by source weight, scores the result
//! on four trust pillars, and serves it through a small HTTP API backed by a
//! quality-differentiated cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod fusion;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod scoring;
pub mod services;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{BlobStore, CachePolicy, ProductCache, SqliteStore};
use crate::config::ServiceConfig;
use crate::fusion::default_weight_table;
use crate::pipeline::Resolver;
use crate::providers::ProviderRegistry;
use crate::services::{
    FoodRecallClient, ImageCacher, RateLimitedDispatcher, RecallChecker, TieredOrchestrator,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            startup_time: Utc::now(),
        }
    }
}

/// Wire the full resolution pipeline from configuration and a database pool
pub fn build_resolver(config: &ServiceConfig, db: SqlitePool) -> Result<Arc<Resolver>> {
    let timeout = Duration::from_millis(config.provider_timeout_ms);

    let registry = ProviderRegistry::build(config)
        .map_err(|e| Error::Config(format!("Provider setup failed: {e}")))?;
    let dispatcher = Arc::new(RateLimitedDispatcher::new(registry.limits));
    let orchestrator = Arc::new(TieredOrchestrator::new(registry.tiers, dispatcher, timeout));

    let store = Arc::new(SqliteStore::new(db));
    let product_cache = Arc::new(ProductCache::new(store, CachePolicy::default()));

    let recall_source = Arc::new(
        FoodRecallClient::new(&config.user_agent, timeout)
            .map_err(|e| Error::Config(format!("Recall client setup failed: {e}")))?,
    );
    let recall_checker = Arc::new(RecallChecker::new(
        recall_source,
        Duration::from_millis(config.recall_deadline_ms),
    ));

    let blobs = Arc::new(BlobStore::new(config.blob_dir()));
    let image_cacher = Arc::new(ImageCacher::new(&config.user_agent, timeout, blobs));

    Ok(Arc::new(Resolver::new(
        orchestrator,
        default_weight_table(),
        product_cache,
        recall_checker,
        image_cacher,
    )))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::product_routes())
        .merge(api::health_routes())
        .with_state(state)
}
