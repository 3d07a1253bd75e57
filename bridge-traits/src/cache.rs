//! Shared Cache Abstraction
//!
//! A keyed byte store with per-entry expiry, shared by every worker process.
//! Keys embed a version or modification stamp, so entries are never
//! invalidated explicitly: a content change simply produces a new key and the
//! old entry ages out.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{BridgeError, Result};

/// Keyed TTL store
///
/// Callers treat every error from this trait as a cache miss; implementations
/// should still report failures faithfully so they can be logged.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cache::CacheStore;
///
/// async fn remember(store: &dyn CacheStore, key: &str, bytes: &[u8]) {
///     if let Err(e) = store.set(key, bytes, Duration::from_secs(3600)).await {
///         tracing::warn!(key, error = %e, "cache write failed");
///     }
/// }
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry; expired entries read as `None`
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store an entry, replacing any previous value under the same key
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Remove an entry
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Process-local cache used in tests and single-process tooling
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (Bytes, Instant)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (Bytes, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| BridgeError::Cache("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            (Bytes::copy_from_slice(value), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut entries = self.lock()?;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let store = MemoryCacheStore::new();
        store
            .set("content:test:1:v3:MODS", b"<mods/>", Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get("content:test:1:v3:MODS").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"<mods/>"[..]));
        assert!(store.get("content:test:1:v4:MODS").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let store = MemoryCacheStore::new();
        store.set("k", b"v", Duration::ZERO).await.unwrap();

        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty());
    }
}
