//! Product resolution pipeline
//!
//! Single entry point tying the stages together: cache lookup, tiered
//! provider fan-out, weighted fusion, trust scoring, cache write, and the
//! fire-and-forget side channels (recall enrichment, image blob copy).

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::ProductCache;
use crate::error::Result;
use crate::fusion::{self, FusionError};
use crate::models::ProductRecord;
use crate::scoring;
use crate::services::{ImageCacher, RecallChecker, TieredOrchestrator};

/// Per-request resolution knobs
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub use_cache: bool,
    pub premium: bool,
    pub offline: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            premium: false,
            offline: false,
        }
    }
}

pub struct Resolver {
    orchestrator: Arc<TieredOrchestrator>,
    weights: HashMap<String, f64>,
    cache: Arc<ProductCache>,
    recall_checker: Arc<RecallChecker>,
    image_cacher: Arc<ImageCacher>,
}

impl Resolver {
    pub fn new(
        orchestrator: Arc<TieredOrchestrator>,
        weights: HashMap<String, f64>,
        cache: Arc<ProductCache>,
        recall_checker: Arc<RecallChecker>,
        image_cacher: Arc<ImageCacher>,
    ) -> Self {
        Self {
            orchestrator,
            weights,
            cache,
            recall_checker,
            image_cacher,
        }
    }

    /// Resolve a barcode to a scored product record.
    ///
    /// Returns `Ok(None)` only when offline with no cache entry, or when no
    /// tier produced any record at all. Cache and side-channel failures are
    /// logged and never fail the resolution.
    pub async fn resolve(
        &self,
        barcode: &str,
        opts: ResolveOptions,
    ) -> Result<Option<ProductRecord>> {
        if opts.use_cache {
            if let Some(entry) = self.cache.get(barcode).await {
                debug!(barcode, source = %entry.record.source, "Cache hit");
                return Ok(Some(entry.record));
            }
        }

        if opts.offline {
            debug!(barcode, "Offline with no cache entry");
            return Ok(None);
        }

        let partials = self.orchestrator.resolve_partials(barcode).await;
        let mut record = match fusion::merge(&partials, Some(&self.weights)) {
            Ok(record) => record,
            Err(FusionError::EmptyInput) => {
                warn!(barcode, "No provider produced a record");
                return Ok(None);
            }
        };

        if let Some((trust, breakdown)) = scoring::score(&record) {
            record.trust_score = Some(trust);
            record.score_breakdown = Some(breakdown);
        }

        info!(
            barcode,
            sources = partials.len(),
            trust = ?record.trust_score,
            "Resolved product"
        );

        if let Err(e) = self.cache.put(&record, opts.premium).await {
            warn!(barcode, error = %e, "Cache write failed");
        }

        self.spawn_side_channels(&record, opts.premium);

        Ok(Some(record))
    }

    /// Force a fresh resolution, bypassing any cached entry
    pub async fn refresh(&self, barcode: &str, premium: bool) -> Result<Option<ProductRecord>> {
        self.resolve(
            barcode,
            ResolveOptions {
                use_cache: false,
                premium,
                offline: false,
            },
        )
        .await
    }

    /// Fire-and-forget enrichment: recall lookup (whole-entry rewrite on a
    /// hit) and image blob caching
    fn spawn_side_channels(&self, record: &ProductRecord, premium: bool) {
        if let Some(image_url) = record.image_url.clone() {
            let image_cacher = Arc::clone(&self.image_cacher);
            let barcode = record.barcode.clone();
            tokio::spawn(async move {
                image_cacher.cache_image(&barcode, &image_url).await;
            });
        }

        let checker = Arc::clone(&self.recall_checker);
        let cache = Arc::clone(&self.cache);
        let mut enriched = record.clone();
        tokio::spawn(async move {
            let recalls = checker
                .check(
                    enriched.name.as_deref(),
                    enriched.brand.as_deref(),
                    Some(&enriched.barcode),
                )
                .await;
            if recalls.is_empty() {
                return;
            }
            info!(
                barcode = %enriched.barcode,
                count = recalls.len(),
                "Recall notices found, rewriting cache entry"
            );
            enriched.recalls = Some(recalls);
            if let Err(e) = cache.put(&enriched, premium).await {
                warn!(barcode = %enriched.barcode, error = %e, "Recall enrichment write failed");
            }
        });
    }
}
