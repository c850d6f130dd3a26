//! Database initialization

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use crate::error::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS product_cache (
    barcode TEXT PRIMARY KEY,
    entry TEXT NOT NULL,
    premium INTEGER NOT NULL DEFAULT 0,
    cached_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_product_cache_tier_age
    ON product_cache (premium, cached_at);
"#;

/// Open (creating if missing) the cache database and apply the schema
pub async fn init_database_pool(db_path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    apply_schema(&pool).await?;

    tracing::info!(path = %db_path.display(), "Cache database ready");
    Ok(pool)
}

/// In-memory pool for tests
pub async fn init_memory_pool() -> Result<Pool<Sqlite>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .map_err(Error::Database)?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    Ok(())
}
