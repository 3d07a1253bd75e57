//! Shared Cache Storage using SQLite
//!
//! Every worker process opens the same database file, so the cache is shared
//! without a separate cache server. WAL mode plus a busy timeout keeps
//! concurrent writers from failing on lock contention.

use async_trait::async_trait;
use bridge_traits::{
    cache::CacheStore,
    error::{BridgeError, Result},
};
use bytes::Bytes;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// SQLite-backed cache store implementation
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database at the given path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // Convert path to string, replacing backslashes with forward slashes for SQLite URL
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path_str))
            .map_err(|e| BridgeError::Cache(format!("Invalid cache path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::Cache(format!("Failed to connect to DB: {}", e)))?;

        let store = Self { pool };
        store.initialize().await?;

        debug!(path = ?db_path, "Initialized cache store");
        Ok(store)
    }

    /// Create an in-memory cache store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // One connection: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::Cache(format!("Failed to connect to DB: {}", e)))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::Cache(format!("Failed to create table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::Cache(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    /// Current Unix timestamp in milliseconds
    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let row = sqlx::query("SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(Self::now_millis())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::Cache(format!("Failed to read {}: {}", key, e)))?;

        Ok(row.map(|row| {
            let value: Vec<u8> = row.get(0);
            Bytes::from(value)
        }))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = Self::now_millis() + ttl.as_millis() as i64;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::Cache(format!("Failed to write {}: {}", key, e)))?;

        debug!(key = key, ttl_secs = ttl.as_secs(), "Stored cache entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Cache(format!("Failed to delete {}: {}", key, e)))?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Self::now_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Cache(format!("Failed to purge cache: {}", e)))?;

        Ok(result.rows_affected())
    }
}
