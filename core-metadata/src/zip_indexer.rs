//! Zip content indexer
//!
//! Lists the members of an object's `ZIP` stream into the index, but only
//! when the archive changed since the last listing. The listing is a
//! separate atomic patch, so it never disturbs the rest of the document.
//! Any failure to fetch or read the archive leaves the index untouched.

use bridge_traits::Clock;
use core_storage::{parse_utc, to_index_string, StorageObject, StorageResolver};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::document::{AtomicPatch, DocumentSnapshot};
use crate::error::{MetadataError, Result};

pub const ZIP_STREAM: &str = "ZIP";
pub const ZIP_FILELIST_FIELD: &str = "zip_filelist_ssim";
pub const ZIP_TIMESTAMP_FIELD: &str = "zip_filelist_timestamp_dsi";

pub struct ZipIndexer {
    resolver: Arc<StorageResolver>,
    clock: Arc<dyn Clock>,
    temp_dir: PathBuf,
}

impl ZipIndexer {
    pub fn new(resolver: Arc<StorageResolver>, clock: Arc<dyn Clock>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            clock,
            temp_dir: temp_dir.into(),
        }
    }

    /// True when the archive has never been listed or changed since
    pub fn reindex_needed(object: &StorageObject, snapshot: &DocumentSnapshot) -> bool {
        let Some(profile) = object.active_file(ZIP_STREAM) else {
            return false;
        };
        match snapshot.get_str(ZIP_TIMESTAMP_FIELD).and_then(parse_utc) {
            Some(indexed_at) if profile.last_modified <= indexed_at => {
                debug!(
                    pid = %object.id,
                    modified = %profile.last_modified,
                    indexed = %indexed_at,
                    "Archive listing is current"
                );
                false
            }
            _ => true,
        }
    }

    /// Patch with the current member list, or `None` when nothing is due
    pub async fn maybe_reindex(&self, object: &StorageObject, snapshot: &DocumentSnapshot) -> Option<AtomicPatch> {
        if !Self::reindex_needed(object, snapshot) {
            return None;
        }

        let names = match self.member_names(object).await {
            Ok(names) => names,
            Err(e) => {
                warn!(pid = %object.id, error = %e, "Archive not indexed");
                return None;
            }
        };

        info!(pid = %object.id, members = names.len(), "Indexed archive listing");
        Some(
            AtomicPatch::new(object.id.clone())
                .set(ZIP_FILELIST_FIELD, json!(names))
                .set(ZIP_TIMESTAMP_FIELD, to_index_string(&self.clock.now())),
        )
    }

    async fn member_names(&self, object: &StorageObject) -> Result<Vec<String>> {
        let mut stream = self.resolver.open_stream(object, ZIP_STREAM).await?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let temp = tempfile::Builder::new()
            .prefix("zip-")
            .tempfile_in(&self.temp_dir)?;
        let mut file = tokio::fs::File::from_std(temp.reopen()?);
        tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;
        drop(file);

        tokio::task::spawn_blocking(move || list_members(temp.path()))
            .await
            .map_err(|e| MetadataError::Archive(e.to_string()))?
    }
}

/// Sorted member names of an archive on disk, without directory entries
pub fn list_members(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let archive = zip::ZipArchive::new(file).map_err(|e| MetadataError::Archive(e.to_string()))?;
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}
