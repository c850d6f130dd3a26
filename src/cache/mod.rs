//! Quality-differentiated product cache
//!
//! Expiry is computed per entry at write time: low-confidence or
//! low-quality records get a short TTL so they are re-resolved as upstream
//! data improves, everything else lives longer for premium callers than for
//! standard ones. Reads treat an expired entry as a miss and evict it.
//! Capacity is bounded per caller tier with oldest-first trimming on write.

pub mod store;

pub use store::{BlobStore, MemoryStore, SqliteStore};

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::models::{CacheEntry, ProductRecord};
use crate::providers::{source_class, SourceClass};
use store::{CacheStore, StoreError};

/// TTL and capacity policy
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// TTL for fallback-source or sub-threshold quality/completion entries
    pub low_quality_ttl: Duration,
    /// TTL for standard-tier callers
    pub standard_ttl: Duration,
    /// TTL for premium-tier callers
    pub premium_ttl: Duration,
    /// Entry cap for standard-tier callers
    pub standard_capacity: u64,
    /// Entry cap for premium-tier callers
    pub premium_capacity: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            low_quality_ttl: Duration::days(1),
            standard_ttl: Duration::days(7),
            premium_ttl: Duration::days(30),
            standard_capacity: 200,
            premium_capacity: 1000,
        }
    }
}

const QUALITY_TTL_THRESHOLD: f64 = 50.0;

/// Differentiated cache over a pluggable store
pub struct ProductCache {
    store: Arc<dyn CacheStore>,
    policy: CachePolicy,
}

impl ProductCache {
    pub fn new(store: Arc<dyn CacheStore>, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    /// TTL an entry receives at write time
    pub fn ttl_for(&self, record: &ProductRecord, premium: bool) -> Duration {
        let fallback_origin = source_class(&record.source) == SourceClass::WebSearch;
        if fallback_origin
            || record.quality < QUALITY_TTL_THRESHOLD
            || record.completion < QUALITY_TTL_THRESHOLD
        {
            self.policy.low_quality_ttl
        } else if premium {
            self.policy.premium_ttl
        } else {
            self.policy.standard_ttl
        }
    }

    /// Look up a record; an expired entry is a miss and is proactively
    /// evicted. Storage failures degrade to a miss so the pipeline can still
    /// complete with live provider calls.
    pub async fn get(&self, barcode: &str) -> Option<CacheEntry> {
        let entry = match self.store.get(barcode).await {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(barcode, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        if entry.expires_at <= Utc::now() {
            tracing::debug!(barcode, "Cache entry expired, evicting");
            if let Err(e) = self.store.delete(barcode).await {
                tracing::warn!(barcode, error = %e, "Failed to evict expired entry");
            }
            return None;
        }

        tracing::debug!(barcode, "Cache hit");
        Some(entry)
    }

    /// Write a resolved record, replacing any existing entry wholesale, and
    /// trim the caller tier back under its capacity.
    pub async fn put(&self, record: &ProductRecord, premium: bool) -> Result<(), StoreError> {
        let now = Utc::now();
        let ttl = self.ttl_for(record, premium);
        let entry = CacheEntry {
            record: record.clone(),
            cached_at: now,
            expires_at: now + ttl,
            premium,
        };

        self.store.put(&record.barcode, &entry).await?;

        let capacity = if premium {
            self.policy.premium_capacity
        } else {
            self.policy.standard_capacity
        };
        if self.store.count(premium).await? > capacity {
            let evicted = self.store.evict_oldest(premium, capacity).await?;
            tracing::debug!(premium, evicted, "Cache over capacity, trimmed oldest entries");
        }

        tracing::debug!(
            barcode = %record.barcode,
            premium,
            ttl_hours = ttl.num_hours(),
            "Cached resolved record"
        );
        Ok(())
    }

    pub async fn exists(&self, barcode: &str) -> bool {
        self.store.exists(barcode).await.unwrap_or(false)
    }
}
