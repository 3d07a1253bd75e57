//! Metadata inheritance
//!
//! An object lacking a metadata stream borrows it from its original
//! (derivation-of) and then from its parent (part-of). Only direct ancestors
//! are consulted. Ancestor listings come from the shared object cache, which
//! every fresh resolve of that ancestor overwrites, so a changed parent is
//! seen by the children cascaded from it.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::relations::AncestorLinks;
use crate::resolver::StorageResolver;
use crate::types::{ObjectId, StorageObject};

pub struct InheritanceResolver {
    resolver: Arc<StorageResolver>,
}

impl InheritanceResolver {
    pub fn new(resolver: Arc<StorageResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<StorageResolver> {
        &self.resolver
    }

    /// Resolve an ancestor; `None` when it no longer exists
    pub async fn ancestor(&self, pid: &ObjectId) -> Result<Option<StorageObject>> {
        match self.resolver.resolve_cached(pid).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_missing_object() => {
                warn!(ancestor = %pid, error = %e, "Skipping missing ancestor");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Bytes of `stream_id` from the object, its original or its parent
    pub async fn get_metadata_bytes(
        &self,
        object: &StorageObject,
        links: &AncestorLinks,
        stream_id: &str,
    ) -> Result<Option<Bytes>> {
        if object.is_active(stream_id) {
            return match self.resolver.get_file(object, stream_id).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.is_file_not_found() => Ok(None),
                Err(e) => Err(e),
            };
        }

        for pid in [links.original.as_ref(), links.parent.as_ref()].into_iter().flatten() {
            let Some(ancestor) = self.ancestor(pid).await? else {
                continue;
            };
            if !ancestor.is_active(stream_id) {
                continue;
            }
            match self.resolver.get_file(&ancestor, stream_id).await {
                Ok(bytes) => {
                    debug!(pid = %object.id, ancestor = %pid, stream = stream_id, "Inherited metadata stream");
                    return Ok(Some(bytes));
                }
                Err(e) if e.is_file_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }
}
