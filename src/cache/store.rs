//! Cache persistence backends
//!
//! The pipeline only assumes a key -> JSON value store with get/put/delete
//! and an existence check, plus directory-style blob storage for images.
//! `SqliteStore` is the production backend; `MemoryStore` backs tests and
//! cache-less deployments.

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::CacheEntry;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key -> cache-entry persistence contract
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;
    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    /// Number of entries written under the given caller tier
    async fn count(&self, premium: bool) -> Result<u64, StoreError>;
    /// Delete oldest-by-write-timestamp entries of the tier until at most
    /// `keep` remain; returns how many were evicted
    async fn evict_oldest(&self, premium: bool, keep: u64) -> Result<u64, StoreError>;
}

/// SQLite-backed store
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row = sqlx::query("SELECT entry FROM product_cache WHERE barcode = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let json: String = row.get("entry");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string(entry)?;
        sqlx::query(
            r#"
            INSERT INTO product_cache (barcode, entry, premium, cached_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(barcode) DO UPDATE SET
                entry = excluded.entry,
                premium = excluded.premium,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(entry.premium)
        .bind(entry.cached_at.to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM product_cache WHERE barcode = ?")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_cache WHERE barcode = ?")
                .bind(key)
                .fetch_one(&self.db)
                .await?;
        Ok(count > 0)
    }

    async fn count(&self, premium: bool) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_cache WHERE premium = ?")
                .bind(premium)
                .fetch_one(&self.db)
                .await?;
        Ok(count as u64)
    }

    async fn evict_oldest(&self, premium: bool, keep: u64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM product_cache
            WHERE premium = ? AND barcode NOT IN (
                SELECT barcode FROM product_cache
                WHERE premium = ?
                ORDER BY cached_at DESC
                LIMIT ?
            )
            "#,
        )
        .bind(premium)
        .bind(premium)
        .bind(keep as i64)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

/// In-memory store for tests and cache-less deployments
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn count(&self, premium: bool) -> Result<u64, StoreError> {
        Ok(self
            .entries
            .lock()
            .await
            .values()
            .filter(|e| e.premium == premium)
            .count() as u64)
    }

    async fn evict_oldest(&self, premium: bool, keep: u64) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let mut tiered: Vec<(String, chrono::DateTime<chrono::Utc>)> = entries
            .iter()
            .filter(|(_, e)| e.premium == premium)
            .map(|(k, e)| (k.clone(), e.cached_at))
            .collect();
        tiered.sort_by_key(|(_, cached_at)| *cached_at);

        let excess = tiered.len().saturating_sub(keep as usize);
        for (key, _) in tiered.into_iter().take(excess) {
            entries.remove(&key);
        }
        Ok(excess as u64)
    }
}

/// Filesystem blob store for cached product images, keyed by barcode
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        // Barcode keys are digits, but sanitize anyway since the key shape
        // is caller-controlled
        let safe: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.root.join(format!("{safe}.img"))
    }

    pub async fn put_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.blob_path(key), bytes).await?;
        Ok(())
    }

    pub async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn has_blob(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.blob_path(key))
            .await
            .unwrap_or(false)
    }
}
