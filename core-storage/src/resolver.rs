//! # Storage Resolver
//!
//! Front door for storage access. Picks the backend for each identifier,
//! caches ancestor listings and file bytes under version-stamped keys, and
//! parses relationship graphs.
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = StorageResolver::new(selector, VersionedCache::new(store));
//! let object = resolver.resolve(&ObjectId::new("test:123")).await?;
//! let mods = resolver.get_file(&object, "MODS").await?;
//! ```

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::backend::{BackendSelector, ContentStream, FileContent};
use crate::cache::{CacheStatsSnapshot, VersionedCache};
use crate::error::{Result, StorageError};
use crate::relations::{Relationships, RELS_EXT};
use crate::types::{ObjectId, StorageObject};

pub struct StorageResolver {
    selector: BackendSelector,
    cache: VersionedCache,
}

impl StorageResolver {
    pub fn new(selector: BackendSelector, cache: VersionedCache) -> Self {
        Self { selector, cache }
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Resolve current object facts straight from the owning backend.
    ///
    /// The shared object listing is refreshed on the way out, or dropped
    /// when the object is gone, so later ancestor lookups see this state.
    #[instrument(skip(self), fields(pid = %pid))]
    pub async fn resolve(&self, pid: &ObjectId) -> Result<StorageObject> {
        match self.selector.select(pid).await.resolve(pid).await {
            Ok(object) => {
                self.cache.put_object(&object).await;
                Ok(object)
            }
            Err(e) => {
                if e.is_missing_object() {
                    self.cache.forget_object(pid).await;
                }
                Err(e)
            }
        }
    }

    /// Resolve an object consulted as an ancestor, through the shared cache
    pub async fn resolve_cached(&self, pid: &ObjectId) -> Result<StorageObject> {
        if let Some(object) = self.cache.get_object(pid).await {
            debug!(pid = %pid, "Ancestor listing served from cache");
            return Ok(object);
        }
        self.resolve(pid).await
    }

    fn ensure_active(object: &StorageObject, name: &str) -> Result<()> {
        if object.is_active(name) {
            Ok(())
        } else {
            Err(StorageError::FileNotFound {
                pid: object.id.to_string(),
                name: name.to_string(),
            })
        }
    }

    /// Bytes of an active file, cached per object version
    pub async fn get_file(&self, object: &StorageObject, name: &str) -> Result<Bytes> {
        Self::ensure_active(object, name)?;
        if let Some(bytes) = self.cache.get_content(object, name).await {
            return Ok(bytes);
        }

        let content = self
            .selector
            .for_kind(object.kind)
            .get_content(object, name)
            .await?;
        self.cache.put_content(object, name, &content.bytes).await;
        Ok(content.bytes)
    }

    /// Bytes and reported media type of an active file, uncached
    pub async fn get_file_with_content_type(&self, object: &StorageObject, name: &str) -> Result<FileContent> {
        Self::ensure_active(object, name)?;
        self.selector
            .for_kind(object.kind)
            .get_content(object, name)
            .await
    }

    pub async fn open_stream(&self, object: &StorageObject, name: &str) -> Result<ContentStream> {
        Self::ensure_active(object, name)?;
        self.selector
            .for_kind(object.kind)
            .open_stream(object, name)
            .await
    }

    /// Parsed relationship graph, or `None` when the object has none
    pub async fn relationships(&self, object: &StorageObject) -> Result<Option<Relationships>> {
        match self.get_file(object, RELS_EXT).await {
            Ok(bytes) => Ok(Some(Relationships::parse(&bytes)?)),
            Err(e) if e.is_file_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
