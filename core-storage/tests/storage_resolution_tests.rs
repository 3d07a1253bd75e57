//! Integration tests for storage resolution
//!
//! Builds OCFL objects in a temporary storage root and checks:
//! - Inventory resolution, sizes and mimetype hints
//! - Tombstoned inventories and legacy fallback errors
//! - Version-stamped content caching
//! - One-hop metadata inheritance order and freshness of ancestor listings

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    CacheStore, HttpClient, HttpRequest, HttpResponse, MemoryCacheStore,
};
use bytes::Bytes;
use core_storage::{
    ocfl::object_path, AncestorLinks, BackendKind, BackendSelector, InheritanceResolver,
    LegacyHttpBackend, ObjectId, OcflBackend, StorageError, StorageResolver, VersionedCache,
};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

/// Legacy service stub answering every request with one status
struct StatusHttpClient {
    status: u16,
    requests: Mutex<Vec<String>>,
}

impl StatusHttpClient {
    fn new(status: u16) -> Self {
        Self {
            status,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpClient for StatusHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url);
        Ok(HttpResponse::new(self.status, ""))
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        Err(BridgeError::HttpStatus {
            url,
            status: self.status,
        })
    }
}

/// Write a single-version OCFL object with the given files
fn write_object(root: &Path, pid: &str, files: &[(&str, &str)]) {
    write_versions(root, pid, &[files.to_vec()]);
}

/// Write an OCFL object with one entry per version; digests are synthetic
fn write_versions(root: &Path, pid: &str, versions: &[Vec<(&str, &str)>]) {
    let dir = object_path(root, &ObjectId::new(pid));
    let mut manifest = serde_json::Map::new();
    let mut version_map = serde_json::Map::new();

    for (index, files) in versions.iter().enumerate() {
        let version = format!("v{}", index + 1);
        let mut state = serde_json::Map::new();
        for (name, bytes) in files {
            let digest = format!("{}-{}-{}", pid, name, bytes.len());
            let relative = format!("{}/content/{}", version, name);
            let path = dir.join(&relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, bytes).unwrap();
            manifest
                .entry(digest.clone())
                .or_insert_with(|| json!([relative]));
            state.insert(digest, json!([name]));
        }
        version_map.insert(
            version,
            json!({"created": format!("2020-0{}-01T00:00:00Z", index + 1), "state": state}),
        );
    }

    let inventory = json!({
        "id": pid,
        "type": "https://ocfl.io/1.0/spec/#inventory",
        "digestAlgorithm": "sha512",
        "head": format!("v{}", versions.len()),
        "manifest": manifest,
        "versions": version_map,
    });
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("inventory.json"), inventory.to_string()).unwrap();
}

fn rels_ext(relations: &str) -> String {
    format!(
        r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                 xmlns:rel="info:fedora/fedora-system:def/relations-external#">
             <rdf:Description rdf:about="info:fedora/test:child">{}</rdf:Description>
           </rdf:RDF>"#,
        relations
    )
}

/// Shared cache that accepts writes and never returns them
struct NeverHitStore;

#[async_trait]
impl CacheStore for NeverHitStore {
    async fn get(&self, _key: &str) -> BridgeResult<Option<Bytes>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> BridgeResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> BridgeResult<()> {
        Ok(())
    }
}

fn resolver(root: &Path, legacy_status: u16) -> Arc<StorageResolver> {
    resolver_with_store(root, legacy_status, Arc::new(MemoryCacheStore::new()))
}

fn resolver_with_store(
    root: &Path,
    legacy_status: u16,
    store: Arc<dyn CacheStore>,
) -> Arc<StorageResolver> {
    let legacy = LegacyHttpBackend::new(
        Arc::new(StatusHttpClient::new(legacy_status)),
        "https://storage.test/",
        "",
    );
    let selector = BackendSelector::with_legacy(OcflBackend::new(root), legacy);
    Arc::new(StorageResolver::new(selector, VersionedCache::new(store)))
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_resolve_ocfl_object() {
    let root = TempDir::new().unwrap();
    let rels_int = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                          xmlns:fedora-model="info:fedora/fedora-system:def/model#">
        <rdf:Description rdf:about="info:fedora/test:1/content">
          <fedora-model:downloadFilename>report.pdf</fedora-model:downloadFilename>
        </rdf:Description>
      </rdf:RDF>"#;
    write_object(
        root.path(),
        "test:1",
        &[
            ("MODS", "<mods/>"),
            ("content", "%PDF-1.4"),
            ("RELS-INT", rels_int),
        ],
    );

    let object = resolver(root.path(), 500)
        .resolve(&ObjectId::new("test:1"))
        .await
        .unwrap();

    assert_eq!(object.kind, BackendKind::ContentAddressable);
    assert_eq!(object.location, "ocfl");
    assert_eq!(object.head_version.as_deref(), Some("v1"));
    assert_eq!(object.active_file_names(), vec!["MODS", "RELS-INT", "content"]);

    let content = object.active_file("content").unwrap();
    assert_eq!(content.mimetype, "application/pdf");
    assert_eq!(content.size, 8);
    assert_eq!(content.checksum_type, "SHA-512");
    assert_eq!(object.total_size(), 7 + 8 + rels_int.len() as u64);
}

#[tokio::test]
async fn test_tombstoned_inventory_is_deleted() {
    let root = TempDir::new().unwrap();
    write_versions(root.path(), "test:gone", &[vec![("MODS", "<mods/>")], vec![]]);

    let err = resolver(root.path(), 200)
        .resolve(&ObjectId::new("test:gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Deleted { .. }));
}

#[tokio::test]
async fn test_missing_object_falls_back_to_legacy() {
    let root = TempDir::new().unwrap();

    let err = resolver(root.path(), 404)
        .resolve(&ObjectId::new("test:nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_earlier_version_files_are_deleted() {
    let root = TempDir::new().unwrap();
    write_versions(
        root.path(),
        "test:2",
        &[
            vec![("MODS", "<mods/>"), ("OCR", "old text")],
            vec![("MODS", "<mods>v2</mods>")],
        ],
    );

    let object = resolver(root.path(), 500)
        .resolve(&ObjectId::new("test:2"))
        .await
        .unwrap();

    assert_eq!(object.active_file_names(), vec!["MODS"]);
    assert_eq!(object.all_file_names(), vec!["MODS", "OCR"]);
    assert_eq!(object.head_version.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_content_cached_per_version() {
    let root = TempDir::new().unwrap();
    write_object(root.path(), "test:3", &[("MODS", "<mods/>")]);

    let resolver = resolver(root.path(), 500);
    let object = resolver.resolve(&ObjectId::new("test:3")).await.unwrap();
    assert_eq!(&resolver.get_file(&object, "MODS").await.unwrap()[..], b"<mods/>");

    // same version: served from cache even once the file is gone
    std::fs::remove_dir_all(object_path(root.path(), &object.id)).unwrap();
    assert_eq!(&resolver.get_file(&object, "MODS").await.unwrap()[..], b"<mods/>");
    assert_eq!(resolver.cache_stats().hits, 1);

    let err = resolver.get_file(&object, "DWC").await.unwrap_err();
    assert!(err.is_file_not_found());
}

// ============================================================================
// Inheritance
// ============================================================================

#[tokio::test]
async fn test_derivation_source_preferred_over_parent() {
    let root = TempDir::new().unwrap();
    let rels = rels_ext(
        r#"<rel:isPartOf rdf:resource="info:fedora/test:parent"/>
           <rel:isDerivationOf rdf:resource="info:fedora/test:original"/>"#,
    );
    write_object(root.path(), "test:child", &[("RELS-EXT", rels.as_str())]);
    write_object(root.path(), "test:original", &[("MODS", "original")]);
    write_object(root.path(), "test:parent", &[("MODS", "parent")]);

    let resolver = resolver(root.path(), 404);
    let inheritance = InheritanceResolver::new(resolver.clone());
    let child = resolver.resolve(&ObjectId::new("test:child")).await.unwrap();
    let links = resolver
        .relationships(&child)
        .await
        .unwrap()
        .unwrap()
        .ancestors();

    let bytes = inheritance
        .get_metadata_bytes(&child, &links, "MODS")
        .await
        .unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"original"[..]));
}

#[tokio::test]
async fn test_missing_ancestor_is_skipped() {
    let root = TempDir::new().unwrap();
    write_object(root.path(), "test:child", &[("PDF", "%PDF")]);
    write_object(root.path(), "test:parent", &[("MODS", "parent")]);

    let resolver = resolver(root.path(), 404);
    let inheritance = InheritanceResolver::new(resolver.clone());
    let child = resolver.resolve(&ObjectId::new("test:child")).await.unwrap();
    let links = AncestorLinks {
        original: Some(ObjectId::new("test:vanished")),
        parent: Some(ObjectId::new("test:parent")),
    };

    let bytes = inheritance
        .get_metadata_bytes(&child, &links, "MODS")
        .await
        .unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"parent"[..]));

    let none = inheritance
        .get_metadata_bytes(&child, &links, "TEI")
        .await
        .unwrap();
    assert!(none.is_none());

    // absence is not remembered once the original appears
    write_object(root.path(), "test:vanished", &[("MODS", "original")]);
    let bytes = inheritance
        .get_metadata_bytes(&child, &links, "MODS")
        .await
        .unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"original"[..]));
}

fn parent_links() -> AncestorLinks {
    AncestorLinks {
        original: None,
        parent: Some(ObjectId::new("test:parent")),
    }
}

#[tokio::test]
async fn test_reindexed_parent_reaches_child() {
    let root = TempDir::new().unwrap();
    write_object(root.path(), "test:child", &[("PDF", "%PDF")]);
    write_object(root.path(), "test:parent", &[("DC", "<dc/>")]);

    let resolver = resolver(root.path(), 404);
    let inheritance = InheritanceResolver::new(resolver.clone());
    let child = resolver.resolve(&ObjectId::new("test:child")).await.unwrap();

    let before = inheritance
        .get_metadata_bytes(&child, &parent_links(), "MODS")
        .await
        .unwrap();
    assert!(before.is_none());

    // parent gains MODS in v2 and is reindexed before its children
    write_versions(
        root.path(),
        "test:parent",
        &[
            vec![("DC", "<dc/>")],
            vec![("DC", "<dc/>"), ("MODS", "parent v2")],
        ],
    );
    let parent = resolver.resolve(&ObjectId::new("test:parent")).await.unwrap();
    assert_eq!(parent.head_version.as_deref(), Some("v2"));

    let after = inheritance
        .get_metadata_bytes(&child, &parent_links(), "MODS")
        .await
        .unwrap();
    assert_eq!(after.as_deref(), Some(&b"parent v2"[..]));
}

#[tokio::test]
async fn test_ancestor_read_fresh_without_shared_cache() {
    let root = TempDir::new().unwrap();
    write_object(root.path(), "test:child", &[("PDF", "%PDF")]);
    write_object(root.path(), "test:parent", &[("DC", "<dc/>")]);

    let resolver = resolver_with_store(root.path(), 404, Arc::new(NeverHitStore));
    let inheritance = InheritanceResolver::new(resolver.clone());
    let child = resolver.resolve(&ObjectId::new("test:child")).await.unwrap();

    let before = inheritance
        .get_metadata_bytes(&child, &parent_links(), "MODS")
        .await
        .unwrap();
    assert!(before.is_none());

    write_versions(
        root.path(),
        "test:parent",
        &[
            vec![("DC", "<dc/>")],
            vec![("DC", "<dc/>"), ("MODS", "parent v2")],
        ],
    );

    let after = inheritance
        .get_metadata_bytes(&child, &parent_links(), "MODS")
        .await
        .unwrap();
    assert_eq!(after.as_deref(), Some(&b"parent v2"[..]));
}

#[tokio::test]
async fn test_content_read_at_resolved_version() {
    let root = TempDir::new().unwrap();
    write_object(root.path(), "test:4", &[("MODS", "<mods>one</mods>")]);

    let resolver = resolver_with_store(root.path(), 500, Arc::new(NeverHitStore));
    let stale = resolver.resolve(&ObjectId::new("test:4")).await.unwrap();

    write_versions(
        root.path(),
        "test:4",
        &[
            vec![("MODS", "<mods>one</mods>")],
            vec![("MODS", "<mods>second</mods>")],
        ],
    );

    let bytes = resolver.get_file(&stale, "MODS").await.unwrap();
    assert_eq!(&bytes[..], b"<mods>one</mods>");

    let current = resolver.resolve(&ObjectId::new("test:4")).await.unwrap();
    let bytes = resolver.get_file(&current, "MODS").await.unwrap();
    assert_eq!(&bytes[..], b"<mods>second</mods>");
}
