//! Storage backend capability
//!
//! Two backends answer the same questions: the local content-addressable
//! (OCFL) store and the legacy HTTP file-listing service. Which one owns an
//! object is decided per identifier by probing for its local inventory.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::Result;
use crate::legacy::LegacyHttpBackend;
use crate::ocfl::OcflBackend;
use crate::types::{BackendKind, ObjectId, StorageObject};

/// Streamed file body
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// File bytes together with the media type the backend reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl FileContent {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }
}

/// One storage backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Resolve current object facts.
    ///
    /// Fails with `NotFound` or `Deleted` when the object is gone.
    async fn resolve(&self, pid: &ObjectId) -> Result<StorageObject>;

    /// Read a whole file of a resolved object
    async fn get_content(&self, object: &StorageObject, name: &str) -> Result<FileContent>;

    /// Open a file of a resolved object for streaming
    async fn open_stream(&self, object: &StorageObject, name: &str) -> Result<ContentStream>;
}

/// Picks the backend that owns an identifier
pub struct BackendSelector {
    ocfl: Arc<OcflBackend>,
    legacy: Arc<dyn StorageBackend>,
}

impl BackendSelector {
    pub fn new(ocfl: Arc<OcflBackend>, legacy: Arc<dyn StorageBackend>) -> Self {
        Self { ocfl, legacy }
    }

    pub fn with_legacy(ocfl: OcflBackend, legacy: LegacyHttpBackend) -> Self {
        Self::new(Arc::new(ocfl), Arc::new(legacy))
    }

    /// Backend for an identifier, preferring a local inventory when one exists
    pub async fn select(&self, pid: &ObjectId) -> Arc<dyn StorageBackend> {
        if self.ocfl.has_object(pid).await {
            debug!(pid = %pid, "Object has a local inventory");
            self.ocfl.clone()
        } else {
            self.legacy.clone()
        }
    }

    /// Backend that produced a resolved object
    pub fn for_kind(&self, kind: BackendKind) -> Arc<dyn StorageBackend> {
        match kind {
            BackendKind::ContentAddressable => self.ocfl.clone(),
            BackendKind::Legacy => self.legacy.clone(),
        }
    }
}
