//! # Content-Addressable Backend
//!
//! Reads objects from a local OCFL storage root. Each object lives in a
//! hash-sharded directory holding an `inventory.json`: a manifest mapping
//! content digests to physical paths, and an ordered set of versions each
//! mapping digests to the logical file names present in that version.
//!
//! ## Layout
//!
//! ```text
//! <root>/<h[0..3]>/<h[3..6]>/<h[6..9]>/<pid, ':' as %3a>/inventory.json
//! ```
//!
//! where `h` is the hex SHA-256 of the identifier.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::backend::{ContentStream, FileContent, StorageBackend};
use crate::error::{Result, StorageError};
use crate::mime::infer_mimetype;
use crate::rdf::RdfGraph;
use crate::relations::{DOWNLOAD_FILENAME, RELS_INT};
use crate::timestamp::parse_utc;
use crate::types::{BackendKind, FileProfile, FileState, ObjectId, StorageObject};

pub const INVENTORY_FILE: &str = "inventory.json";
pub const OCFL_LOCATION: &str = "ocfl";

/// Directory of an object under the storage root
pub fn object_path(root: &Path, pid: &ObjectId) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(pid.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    root.join(&digest[0..3])
        .join(&digest[3..6])
        .join(&digest[6..9])
        .join(pid.as_str().replace(':', "%3a"))
}

/// Name used in file profiles for an inventory digest algorithm
pub fn checksum_type_label(algorithm: &str) -> String {
    match algorithm.to_lowercase().as_str() {
        "sha512" => "SHA-512".to_string(),
        "sha256" => "SHA-256".to_string(),
        "sha1" => "SHA-1".to_string(),
        "md5" => "MD5".to_string(),
        other => other.to_uppercase(),
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryVersion {
    pub created: String,
    #[serde(default)]
    pub state: BTreeMap<String, Vec<String>>,
}

impl InventoryVersion {
    /// Digest of a logical path in this version
    pub fn digest_of(&self, logical_path: &str) -> Option<&str> {
        self.state
            .iter()
            .find(|(_, paths)| paths.iter().any(|p| p == logical_path))
            .map(|(digest, _)| digest.as_str())
    }

    pub fn logical_paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.state.iter().flat_map(|(digest, paths)| {
            paths.iter().map(move |path| (path.as_str(), digest.as_str()))
        })
    }
}

/// Parsed `inventory.json`
#[derive(Debug, Clone, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "digestAlgorithm")]
    pub digest_algorithm: String,
    pub head: String,
    pub manifest: HashMap<String, Vec<String>>,
    pub versions: HashMap<String, InventoryVersion>,
}

impl Inventory {
    pub fn parse(pid: &ObjectId, bytes: &[u8]) -> Result<Self> {
        let inventory: Inventory =
            serde_json::from_slice(bytes).map_err(|e| invalid(pid, e.to_string()))?;
        // validates ordering and head up front
        inventory.ordered_versions(pid)?;
        Ok(inventory)
    }

    /// Versions oldest first, ordered by their numeric suffix
    pub fn ordered_versions(&self, pid: &ObjectId) -> Result<Vec<(&str, &InventoryVersion)>> {
        let mut numbered = Vec::with_capacity(self.versions.len());
        for (id, version) in &self.versions {
            let number = id
                .strip_prefix('v')
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| invalid(pid, format!("bad version id {}", id)))?;
            numbered.push((number, id.as_str(), version));
        }
        numbered.sort_by_key(|(number, _, _)| *number);

        match numbered.last() {
            Some((_, id, _)) if *id == self.head => {}
            Some(_) => return Err(invalid(pid, format!("head {} is not the last version", self.head))),
            None => return Err(invalid(pid, "no versions".to_string())),
        }

        Ok(numbered.into_iter().map(|(_, id, v)| (id, v)).collect())
    }

    pub fn head_version(&self) -> Option<&InventoryVersion> {
        self.versions.get(&self.head)
    }

    /// Physical path, relative to the object directory, of a head file
    pub fn content_path(&self, logical_path: &str) -> Option<&str> {
        self.content_path_at(&self.head, logical_path)
    }

    /// Physical path of a file as it stood in `version_id`
    pub fn content_path_at(&self, version_id: &str, logical_path: &str) -> Option<&str> {
        let digest = self.versions.get(version_id)?.digest_of(logical_path)?;
        self.manifest
            .get(digest)
            .and_then(|paths| paths.first())
            .map(String::as_str)
    }
}

fn invalid(pid: &ObjectId, message: String) -> StorageError {
    StorageError::InvalidInventory {
        pid: pid.to_string(),
        message,
    }
}

fn parse_created(pid: &ObjectId, version_id: &str, version: &InventoryVersion) -> Result<DateTime<Utc>> {
    parse_utc(&version.created)
        .ok_or_else(|| invalid(pid, format!("bad created time on {}", version_id)))
}

/// Head-state file facts before sizes and mimetypes are filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadFile {
    pub name: String,
    pub digest: String,
    pub last_modified: DateTime<Utc>,
}

/// Version-level summary of an inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySummary {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub head: String,
    pub active: Vec<HeadFile>,
    pub deleted: Vec<String>,
}

impl Inventory {
    /// Work out active and deleted files, walking versions from the head back.
    ///
    /// Fails with `Deleted` when the head state is empty.
    pub fn summarize(&self, pid: &ObjectId) -> Result<InventorySummary> {
        let versions = self.ordered_versions(pid)?;
        let (head_id, head) = versions[versions.len() - 1];

        if head.state.is_empty() {
            return Err(StorageError::Deleted {
                pid: pid.to_string(),
            });
        }

        let (first_id, first) = versions[0];
        let created = parse_created(pid, first_id, first)?;
        let modified = parse_created(pid, head_id, head)?;

        let mut active = Vec::new();
        for (name, digest) in head.logical_paths() {
            let mut since = (head_id, head);
            for &(id, version) in versions.iter().rev().skip(1) {
                if version.digest_of(name) == Some(digest) {
                    since = (id, version);
                } else {
                    break;
                }
            }
            active.push(HeadFile {
                name: name.to_string(),
                digest: digest.to_string(),
                last_modified: parse_created(pid, since.0, since.1)?,
            });
        }
        active.sort_by(|a, b| a.name.cmp(&b.name));

        let mut deleted: Vec<String> = versions
            .iter()
            .rev()
            .skip(1)
            .flat_map(|(_, version)| version.logical_paths().map(|(name, _)| name))
            .filter(|name| head.digest_of(name).is_none())
            .map(str::to_string)
            .collect();
        deleted.sort();
        deleted.dedup();

        Ok(InventorySummary {
            created,
            modified,
            head: head_id.to_string(),
            active,
            deleted,
        })
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Local OCFL storage root
#[derive(Debug, Clone)]
pub struct OcflBackend {
    root: PathBuf,
}

impl OcflBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, pid: &ObjectId) -> PathBuf {
        object_path(&self.root, pid)
    }

    /// True when the object has an inventory under this root
    pub async fn has_object(&self, pid: &ObjectId) -> bool {
        tokio::fs::try_exists(self.object_path(pid).join(INVENTORY_FILE))
            .await
            .unwrap_or(false)
    }

    async fn load_inventory(&self, pid: &ObjectId) -> Result<Inventory> {
        let path = self.object_path(pid).join(INVENTORY_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    pid: pid.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Inventory::parse(pid, &bytes)
    }

    fn content_file(&self, pid: &ObjectId, inventory: &Inventory, name: &str) -> Result<PathBuf> {
        self.version_file(pid, inventory, &inventory.head, name)
    }

    /// Physical file for `name` in the version an object was resolved at
    fn version_file(
        &self,
        pid: &ObjectId,
        inventory: &Inventory,
        version_id: &str,
        name: &str,
    ) -> Result<PathBuf> {
        inventory
            .content_path_at(version_id, name)
            .map(|relative| self.object_path(pid).join(relative))
            .ok_or_else(|| StorageError::FileNotFound {
                pid: pid.to_string(),
                name: name.to_string(),
            })
    }

    /// Reads from the version the object was resolved at, so bytes always
    /// match the profile and the cache key they are stored under.
    async fn resolved_file(&self, object: &StorageObject, name: &str) -> Result<PathBuf> {
        let inventory = self.load_inventory(&object.id).await?;
        let version_id = object.head_version.as_deref().unwrap_or(&inventory.head);
        self.version_file(&object.id, &inventory, version_id, name)
    }

    /// Download-filename hints keyed by file name, read from `RELS-INT`
    async fn filename_hints(
        &self,
        pid: &ObjectId,
        inventory: &Inventory,
        names: &[HeadFile],
    ) -> HashMap<String, String> {
        let mut hints = HashMap::new();
        let Ok(path) = self.content_file(pid, inventory, RELS_INT) else {
            return hints;
        };

        let graph = match tokio::fs::read(&path).await {
            Ok(bytes) => RdfGraph::parse(&bytes),
            Err(e) => Err(e.into()),
        };
        let graph = match graph {
            Ok(graph) => graph,
            Err(e) => {
                warn!(pid = %pid, error = %e, "Ignoring unreadable RELS-INT");
                return hints;
            }
        };

        for file in names {
            let subject = format!("info:fedora/{}/{}", pid, file.name);
            if let Some(hint) = graph.objects_for(&subject, DOWNLOAD_FILENAME).next() {
                hints.insert(file.name.clone(), hint.as_str().to_string());
            };
        }
        hints
    }
}

#[async_trait]
impl StorageBackend for OcflBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ContentAddressable
    }

    async fn resolve(&self, pid: &ObjectId) -> Result<StorageObject> {
        let inventory = self.load_inventory(pid).await?;
        let summary = inventory.summarize(pid)?;
        let object_dir = self.object_path(pid);
        let checksum_type = checksum_type_label(&inventory.digest_algorithm);
        let hints = self.filename_hints(pid, &inventory, &summary.active).await;

        let mut files = BTreeMap::new();
        for file in &summary.active {
            let relative = inventory
                .manifest
                .get(&file.digest)
                .and_then(|paths| paths.first())
                .ok_or_else(|| invalid(pid, format!("digest of {} missing from manifest", file.name)))?;
            let size = tokio::fs::metadata(object_dir.join(relative)).await?.len();
            let mimetype_source = hints.get(&file.name).unwrap_or(&file.name);

            files.insert(
                file.name.clone(),
                FileState::Active(FileProfile {
                    mimetype: infer_mimetype(mimetype_source).to_string(),
                    size,
                    checksum: file.digest.clone(),
                    checksum_type: checksum_type.clone(),
                    last_modified: file.last_modified,
                }),
            );
        }
        for name in summary.deleted {
            files.insert(name, FileState::Deleted);
        }

        info!(
            pid = %pid,
            path = %object_dir.display(),
            version = %summary.head,
            "Resolved object from OCFL inventory"
        );

        Ok(StorageObject {
            id: pid.clone(),
            created: summary.created,
            modified: summary.modified,
            kind: BackendKind::ContentAddressable,
            location: OCFL_LOCATION.to_string(),
            head_version: Some(summary.head),
            files,
        })
    }

    async fn get_content(&self, object: &StorageObject, name: &str) -> Result<FileContent> {
        let path = self.resolved_file(object, name).await?;
        debug!(pid = %object.id, file = name, "Reading OCFL content");

        let bytes = tokio::fs::read(&path).await?;
        let content_type = object
            .active_file(name)
            .map(|profile| profile.mimetype.clone());
        Ok(FileContent::new(Bytes::from(bytes), content_type))
    }

    async fn open_stream(&self, object: &StorageObject, name: &str) -> Result<ContentStream> {
        let path = self.resolved_file(object, name).await?;
        let file = tokio::fs::File::open(&path).await?;
        Ok(Box::new(file))
    }
}
