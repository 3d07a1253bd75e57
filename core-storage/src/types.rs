//! # Storage Data Model
//!
//! Backend-agnostic facts about a stored object. Both backends produce the
//! same [`StorageObject`], with every timestamp already normalised to UTC, so
//! nothing downstream needs to know which backend answered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::timestamp::to_index_string;

// ============================================================================
// ID Types
// ============================================================================

/// Persistent identifier of a digital object (e.g. `bdr:123`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(pid: impl Into<String>) -> Self {
        Self(pid.into())
    }

    /// Extract the identifier from a relationship URI such as
    /// `info:fedora/bdr:123`, taking everything after the last `/`.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let pid = uri.rsplit('/').next().unwrap_or(uri).trim();
        if pid.is_empty() {
            None
        } else {
            Some(Self(pid.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(pid: &str) -> Self {
        Self(pid.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(pid: String) -> Self {
        Self(pid)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Object Model
// ============================================================================

/// Which backend holds an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Legacy HTTP file-listing service
    Legacy,
    /// Local content-addressable (OCFL) inventory
    ContentAddressable,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Legacy => "legacy",
            BackendKind::ContentAddressable => "content_addressable",
        }
    }
}

/// Profile of an active file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProfile {
    pub mimetype: String,
    pub size: u64,
    pub checksum: String,
    pub checksum_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Presence state of a file in the current version of an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum FileState {
    #[serde(rename = "A")]
    Active(FileProfile),
    /// Present in an earlier version only
    #[serde(rename = "D")]
    Deleted,
}

impl FileState {
    pub fn is_active(&self) -> bool {
        matches!(self, FileState::Active(_))
    }

    pub fn profile(&self) -> Option<&FileProfile> {
        match self {
            FileState::Active(profile) => Some(profile),
            FileState::Deleted => None,
        }
    }
}

/// Resolved facts about one object
///
/// Built fresh for every job and never persisted, apart from short-lived
/// cache entries for objects consulted as ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    pub id: ObjectId,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub kind: BackendKind,
    /// Storage location label reported by the backend
    pub location: String,
    /// Head version id, for inventories that have one
    pub head_version: Option<String>,
    /// Every file the object has ever had, keyed by file id
    pub files: BTreeMap<String, FileState>,
}

impl StorageObject {
    /// Active files in file-id order
    pub fn active_files(&self) -> impl Iterator<Item = (&str, &FileProfile)> {
        self.files
            .iter()
            .filter_map(|(name, state)| state.profile().map(|profile| (name.as_str(), profile)))
    }

    pub fn active_file(&self, name: &str) -> Option<&FileProfile> {
        self.files.get(name).and_then(FileState::profile)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_file(name).is_some()
    }

    pub fn active_file_names(&self) -> Vec<String> {
        self.active_files().map(|(name, _)| name.to_string()).collect()
    }

    pub fn all_file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Sum of active file sizes; deleted files never count
    pub fn total_size(&self) -> u64 {
        self.active_files().map(|(_, profile)| profile.size).sum()
    }

    /// Stamp that changes whenever any content of the object changes
    pub fn version_stamp(&self) -> String {
        match &self.head_version {
            Some(version) => version.clone(),
            None => to_index_string(&self.modified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile(size: u64) -> FileProfile {
        FileProfile {
            mimetype: "text/xml".to_string(),
            size,
            checksum: "abc".to_string(),
            checksum_type: "SHA-512".to_string(),
            last_modified: Utc.with_ymd_and_hms(2021, 3, 23, 10, 20, 30).unwrap(),
        }
    }

    fn object() -> StorageObject {
        let mut files = BTreeMap::new();
        files.insert("MODS".to_string(), FileState::Active(profile(10)));
        files.insert("RELS-EXT".to_string(), FileState::Active(profile(5)));
        files.insert("OLD".to_string(), FileState::Deleted);

        StorageObject {
            id: ObjectId::new("test:123"),
            created: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            modified: Utc.with_ymd_and_hms(2021, 3, 23, 10, 20, 30).unwrap(),
            kind: BackendKind::Legacy,
            location: "fedora".to_string(),
            head_version: None,
            files,
        }
    }

    #[test]
    fn test_object_id_from_uri() {
        assert_eq!(
            ObjectId::from_uri("info:fedora/test:123"),
            Some(ObjectId::new("test:123"))
        );
        assert_eq!(ObjectId::from_uri("test:9"), Some(ObjectId::new("test:9")));
        assert_eq!(ObjectId::from_uri("info:fedora/"), None);
    }

    #[test]
    fn test_file_lists_and_size() {
        let obj = object();
        assert_eq!(obj.active_file_names(), vec!["MODS", "RELS-EXT"]);
        assert_eq!(obj.all_file_names(), vec!["MODS", "OLD", "RELS-EXT"]);
        assert_eq!(obj.total_size(), 15);
        assert!(obj.is_active("MODS"));
        assert!(!obj.is_active("OLD"));
        assert!(!obj.is_active("MISSING"));
    }

    #[test]
    fn test_version_stamp_prefers_head_version() {
        let mut obj = object();
        assert_eq!(obj.version_stamp(), "2021-03-23T10:20:30.000000Z");

        obj.head_version = Some("v4".to_string());
        assert_eq!(obj.version_stamp(), "v4");
    }

    #[test]
    fn test_serde_round_trip_keeps_file_states() {
        let obj = object();
        let json = serde_json::to_string(&obj).unwrap();
        assert!(json.contains("\"state\":\"D\""));
        let decoded: StorageObject = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, obj);
    }
}
