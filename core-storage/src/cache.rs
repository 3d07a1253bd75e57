//! Version-stamped storage cache
//!
//! Wraps the shared [`CacheStore`] with the key scheme used for storage
//! data. File content keys carry the object's version stamp, so a new
//! version never reads a stale entry. Every cache failure is logged, counted
//! and then treated as a miss.

use bridge_traits::CacheStore;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{ObjectId, StorageObject};

pub const OBJECT_TTL: Duration = Duration::from_secs(5 * 60);
pub const CONTENT_TTL: Duration = Duration::from_secs(60 * 60);

pub fn object_key(pid: &ObjectId) -> String {
    format!("object:{}", pid)
}

pub fn content_key(object: &StorageObject, name: &str) -> String {
    format!("content:{}:{}:{}", object.id, object.version_stamp(), name)
}

/// Hit, miss and failure counts for one cache
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Storage view over the shared cache
#[derive(Clone)]
pub struct VersionedCache {
    store: Arc<dyn CacheStore>,
    stats: Arc<CacheStats>,
}

impl VersionedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => {
                self.stats.record_hit();
                debug!(key, "Cache hit");
                Some(bytes)
            }
            Ok(None) => {
                self.stats.record_miss();
                None
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        if let Err(e) = self.store.set(key, value, ttl).await {
            self.stats.record_failure();
            warn!(key, error = %e, "Cache write failed");
        }
    }

    pub async fn get_object(&self, pid: &ObjectId) -> Option<StorageObject> {
        let key = object_key(pid);
        let bytes = self.get(&key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(object) => Some(object),
            Err(e) => {
                self.stats.record_failure();
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn put_object(&self, object: &StorageObject) {
        let key = object_key(&object.id);
        match serde_json::to_vec(object) {
            Ok(bytes) => self.set(&key, &bytes, OBJECT_TTL).await,
            Err(e) => {
                self.stats.record_failure();
                warn!(key = %key, error = %e, "Failed to encode object for cache");
            }
        }
    }

    pub async fn forget_object(&self, pid: &ObjectId) {
        let key = object_key(pid);
        if let Err(e) = self.store.delete(&key).await {
            self.stats.record_failure();
            warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    pub async fn get_content(&self, object: &StorageObject, name: &str) -> Option<Bytes> {
        self.get(&content_key(object, name)).await
    }

    pub async fn put_content(&self, object: &StorageObject, name: &str, bytes: &[u8]) {
        self.set(&content_key(object, name), bytes, CONTENT_TTL).await
    }
}
