//! Integration tests for document assembly
//!
//! Objects are written as OCFL fixtures in a temporary storage root and run
//! through the full assembler with canned extractors. Covers:
//! - Storage-only documents and their defaults
//! - Resource-type precedence, including the override table
//! - Descriptive inheritance from ancestors
//! - Rights display flags, technical metadata failures, extracted text
//! - Repeatable output

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    HttpClient, HttpRequest, HttpResponse, MemoryCacheStore,
};
use core_metadata::{
    db::create_test_pool, CollectionLookup, DisplayIdentities, DocumentAssembler, ExtractError,
    Extraction, ExtractorSet, FieldValue, IndexDocument, MetadataError, MetadataExtractor,
    NoOverrides, ResourceTypeOverrides, SqliteInvalidDateReporter, SqliteResourceTypes,
    StreamKind, UpdateCommand, DATE_FIELD, RESOURCE_TYPE_FIELD,
};
use core_storage::{
    ocfl::object_path, BackendSelector, InheritanceResolver, LegacyHttpBackend, ObjectId,
    OcflBackend, StorageResolver, VersionedCache,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Fakes
// ============================================================================

struct NotFoundHttpClient;

#[async_trait]
impl HttpClient for NotFoundHttpClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(404, ""))
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        Err(BridgeError::HttpStatus { url, status: 404 })
    }
}

/// Extractor returning canned fields
struct Canned(Extraction);

impl MetadataExtractor for Canned {
    fn extract(&self, _bytes: &[u8]) -> Result<Extraction, ExtractError> {
        Ok(self.0.clone())
    }
}

/// Extractor that echoes the stream body into one field
struct Echo(&'static str);

impl MetadataExtractor for Echo {
    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        Ok(Extraction::default().field(self.0, String::from_utf8_lossy(bytes).into_owned()))
    }
}

struct Failing(ExtractError);

impl MetadataExtractor for Failing {
    fn extract(&self, _bytes: &[u8]) -> Result<Extraction, ExtractError> {
        Err(self.0.clone())
    }
}

struct NamedCollections;

#[async_trait]
impl CollectionLookup for NamedCollections {
    async fn ancestors(&self, id: &str) -> core_metadata::Result<Vec<String>> {
        Ok(vec!["Library".to_string(), format!("Collection {}", id)])
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn write_object(root: &Path, pid: &str, files: &[(&str, &str)]) {
    let dir = object_path(root, &ObjectId::new(pid));
    let mut manifest = serde_json::Map::new();
    let mut state = serde_json::Map::new();
    for (index, (name, body)) in files.iter().enumerate() {
        let digest = format!("digest{}", index);
        let relative = format!("v1/content/{}", name);
        std::fs::create_dir_all(dir.join("v1/content")).unwrap();
        std::fs::write(dir.join(&relative), body).unwrap();
        manifest.insert(digest.clone(), json!([relative]));
        state.insert(digest, json!([name]));
    }
    let inventory = json!({
        "digestAlgorithm": "sha512",
        "head": "v1",
        "manifest": manifest,
        "versions": {"v1": {"created": "2018-10-01T12:24:59.123456Z", "state": state}},
    });
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("inventory.json"), inventory.to_string()).unwrap();
}

fn rels_ext(pid: &str, body: &str) -> String {
    format!(
        r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                 xmlns:rel="info:fedora/fedora-system:def/relations-external#"
                 xmlns:fedora-model="info:fedora/fedora-system:def/model#">
             <rdf:Description rdf:about="info:fedora/{}">{}</rdf:Description>
           </rdf:RDF>"#,
        pid, body
    )
}

struct Harness {
    _root: TempDir,
    resolver: Arc<StorageResolver>,
    inheritance: Arc<InheritanceResolver>,
}

impl Harness {
    fn new(objects: &[(&str, Vec<(&str, String)>)]) -> Self {
        let root = TempDir::new().unwrap();
        for (pid, files) in objects {
            let files: Vec<(&str, &str)> = files.iter().map(|(n, b)| (*n, b.as_str())).collect();
            write_object(root.path(), pid, &files);
        }

        let legacy = LegacyHttpBackend::new(Arc::new(NotFoundHttpClient), "https://storage.test/", "");
        let resolver = Arc::new(StorageResolver::new(
            BackendSelector::with_legacy(OcflBackend::new(root.path()), legacy),
            VersionedCache::new(Arc::new(MemoryCacheStore::new())),
        ));
        let inheritance = Arc::new(InheritanceResolver::new(resolver.clone()));
        Self {
            _root: root,
            resolver,
            inheritance,
        }
    }

    async fn assembler(
        &self,
        extractors: ExtractorSet,
        overrides: Arc<dyn ResourceTypeOverrides>,
    ) -> (DocumentAssembler, Arc<SqliteInvalidDateReporter>) {
        let reporter = Arc::new(SqliteInvalidDateReporter::new(create_test_pool().await.unwrap()));
        reporter.initialize().await.unwrap();
        let assembler = DocumentAssembler::new(
            self.inheritance.clone(),
            extractors,
            Arc::new(NamedCollections),
            overrides,
            reporter.clone(),
        )
        .with_display_identities(DisplayIdentities {
            public: "PUBLIC".to_string(),
            institution: "CAMPUS".to_string(),
        });
        (assembler, reporter)
    }

    async fn build(&self, assembler: &DocumentAssembler, pid: &str) -> core_metadata::Result<IndexDocument> {
        let object = self.resolver.resolve(&ObjectId::new(pid)).await?;
        let relationships = self.resolver.relationships(&object).await?;
        assembler.build(&object, relationships.as_ref()).await
    }
}

fn text(doc: &IndexDocument, key: &str) -> Option<String> {
    doc.get_text(key).map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_storage_only_document() {
    let harness = Harness::new(&[("test:1", vec![("PDF", "1234".to_string())])]);
    let (assembler, _) = harness.assembler(ExtractorSet::new(), Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();

    let keys: Vec<&str> = doc.keys().collect();
    assert_eq!(
        keys,
        vec![
            "all_ds_ids_ssim",
            "datastreams_ssi",
            DATE_FIELD,
            "ds_ids_ssim",
            "fed_created_dsi",
            "fed_last_modified_dsi",
            "fed_object_size_lsi",
            "object_created_dsi",
            "object_last_modified_dsi",
            "object_size_lsi",
            "pid",
            RESOURCE_TYPE_FIELD,
            "storage_backend_ssi",
            "storage_location_ssi",
        ]
    );
    assert_eq!(text(&doc, RESOURCE_TYPE_FIELD).as_deref(), Some("other"));
    assert_eq!(text(&doc, DATE_FIELD).as_deref(), Some("2018-10-01T12:24:59.123456Z"));
    assert_eq!(text(&doc, "storage_location_ssi").as_deref(), Some("ocfl"));
    assert_eq!(doc.get("object_size_lsi"), Some(&FieldValue::Integer(4)));

    let datastreams: serde_json::Value =
        serde_json::from_str(doc.get_text("datastreams_ssi").unwrap()).unwrap();
    assert_eq!(datastreams["PDF"]["size"], json!(4));
    assert_eq!(datastreams["PDF"]["checksumType"], json!("SHA-512"));
}

#[tokio::test]
async fn test_override_table_always_wins() {
    let harness = Harness::new(&[(
        "test:1",
        vec![("MODS", "<mods/>".to_string()), ("DWC", "<dwc/>".to_string())],
    )]);
    let overrides = SqliteResourceTypes::new(create_test_pool().await.unwrap());
    overrides.initialize().await.unwrap();
    overrides.insert(&ObjectId::new("test:1"), "datasets").await.unwrap();

    let extractors = ExtractorSet::new()
        .with(
            StreamKind::Bibliographic,
            Arc::new(Canned(
                Extraction::default()
                    .field(RESOURCE_TYPE_FIELD, "images")
                    .field("mods_type_of_resource", "cartographic"),
            )),
        )
        .with(
            StreamKind::DarwinCore,
            Arc::new(Canned(Extraction::default().field("dwc_basis_of_record_ssi", "PreservedSpecimen"))),
        );
    let (assembler, _) = harness.assembler(extractors, Arc::new(overrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();
    assert_eq!(text(&doc, RESOURCE_TYPE_FIELD).as_deref(), Some("datasets"));
}

#[tokio::test]
async fn test_specimen_and_title_fallback() {
    let harness = Harness::new(&[("test:1", vec![("DWC", "<dwc/>".to_string())])]);
    let extractors = ExtractorSet::new().with(
        StreamKind::DarwinCore,
        Arc::new(Canned(
            Extraction::default()
                .field("dwc_basis_of_record_ssi", "PreservedSpecimen")
                .field("dwc_accepted_name_usage_ssi", "Quercus alba")
                .field(DATE_FIELD, "2005-06-01T00:00:00Z"),
        )),
    );
    let (assembler, _) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();
    assert_eq!(text(&doc, RESOURCE_TYPE_FIELD).as_deref(), Some("realia"));
    assert_eq!(text(&doc, "primary_title").as_deref(), Some("Quercus alba"));
    assert_eq!(text(&doc, DATE_FIELD).as_deref(), Some("2005-06-01T00:00:00Z"));
}

#[tokio::test]
async fn test_vocabulary_and_invalid_date_report() {
    let harness = Harness::new(&[("test:1", vec![("MODS", "<mods/>".to_string())])]);
    let extractors = ExtractorSet::new().with(
        StreamKind::Bibliographic,
        Arc::new(Canned(
            Extraction::default()
                .field("primary_title", "Map of Providence")
                .field("mods_type_of_resource", vec!["cartographic".to_string()])
                .with_invalid_date(),
        )),
    );
    let (assembler, reporter) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();
    assert_eq!(text(&doc, RESOURCE_TYPE_FIELD).as_deref(), Some("maps"));
    assert_eq!(reporter.reported().await.unwrap(), vec![ObjectId::new("test:1")]);
}

#[tokio::test]
async fn test_tei_without_bibliographic_is_text() {
    let harness = Harness::new(&[("test:1", vec![("TEI", "<TEI/>".to_string())])]);
    let extractors = ExtractorSet::new()
        .with(StreamKind::Tei, Arc::new(Canned(Extraction::default().field("tei_title", "Letters"))));
    let (assembler, _) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();
    assert_eq!(text(&doc, RESOURCE_TYPE_FIELD).as_deref(), Some("text_resources"));
}

#[tokio::test]
async fn test_descriptive_metadata_inherited_from_original() {
    let harness = Harness::new(&[
        (
            "test:child",
            vec![(
                "RELS-EXT",
                rels_ext(
                    "test:child",
                    r#"<rel:isPartOf rdf:resource="info:fedora/test:parent"/>
                       <rel:isDerivationOf rdf:resource="info:fedora/test:original"/>"#,
                ),
            )],
        ),
        ("test:original", vec![("MODS", "from original".to_string())]),
        ("test:parent", vec![("MODS", "from parent".to_string())]),
    ]);
    let extractors = ExtractorSet::new().with(StreamKind::Bibliographic, Arc::new(Echo("primary_title")));
    let (assembler, _) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:child").await.unwrap();
    assert_eq!(text(&doc, "primary_title").as_deref(), Some("from original"));
    assert_eq!(
        doc.get("rel_is_part_of_ssim"),
        Some(&FieldValue::List(vec!["test:parent".to_string()]))
    );
    assert_eq!(text(&doc, "object_type").as_deref(), Some("undetermined"));
}

#[tokio::test]
async fn test_image_rights_and_deposit() {
    let harness = Harness::new(&[(
        "test:1",
        vec![
            (
                "RELS-EXT",
                rels_ext(
                    "test:1",
                    r#"<fedora-model:hasModel rdf:resource="info:fedora/bdr-cmodel:jp2"/>"#,
                ),
            ),
            ("rightsMetadata", "<rights/>".to_string()),
            ("irMetadata", "<ir/>".to_string()),
        ],
    )]);
    let extractors = ExtractorSet::new()
        .with(
            StreamKind::Rights,
            Arc::new(Canned(
                Extraction::default().field("display", vec!["CAMPUS".to_string()]),
            )),
        )
        .with(
            StreamKind::Deposit,
            Arc::new(Canned(
                Extraction::default()
                    .field("depositor", "Jo Smith")
                    .field("deposit_date", "2019-05")
                    .field("collection_date", "May 2019")
                    .field("ir_collection_id", vec!["42".to_string()]),
            )),
        );
    let (assembler, _) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();

    assert_eq!(text(&doc, "object_type").as_deref(), Some("image"));
    assert_eq!(doc.get("iiif_resource_bsi"), Some(&FieldValue::Boolean(true)));

    assert_eq!(doc.get("display_public_bsi"), Some(&FieldValue::Boolean(false)));
    assert_eq!(doc.get("display_institution_bsi"), Some(&FieldValue::Boolean(true)));
    assert_eq!(doc.get("display_private_bsi"), Some(&FieldValue::Boolean(false)));

    assert_eq!(text(&doc, "deposit_date").as_deref(), Some("2019-05-01T00:00:00Z"));
    assert!(!doc.contains("collection_date"));
    assert_eq!(
        doc.get("ir_collection_name"),
        Some(&FieldValue::List(vec!["Library".to_string(), "Collection 42".to_string()]))
    );
}

#[tokio::test]
async fn test_technical_metadata_failures() {
    let objects = [("test:1", vec![("FITS", "<fits/>".to_string())])];

    let harness = Harness::new(&objects);
    let malformed = ExtractorSet::new().with(
        StreamKind::Technical,
        Arc::new(Failing(ExtractError::Malformed("width".to_string()))),
    );
    let (assembler, _) = harness.assembler(malformed, Arc::new(NoOverrides)).await;
    assert!(harness.build(&assembler, "test:1").await.is_ok());

    let invalid = ExtractorSet::new().with(
        StreamKind::Technical,
        Arc::new(Failing(ExtractError::InvalidDocument("not fits".to_string()))),
    );
    let (assembler, _) = harness.assembler(invalid, Arc::new(NoOverrides)).await;
    let err = harness.build(&assembler, "test:1").await.unwrap_err();
    assert!(matches!(err, MetadataError::Extraction { .. }));
}

#[tokio::test]
async fn test_extracted_text_preferred_over_ocr() {
    let page_map = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" LABEL="Issue 1">
        <mets:structMap><mets:div LABEL="Front page"/></mets:structMap></mets:mets>"#;
    let harness = Harness::new(&[(
        "test:1",
        vec![
            ("EXTRACTED_TEXT", page_map.to_string()),
            ("OCR", "ocr words".to_string()),
        ],
    )]);
    let (assembler, _) = harness.assembler(ExtractorSet::new(), Arc::new(NoOverrides)).await;

    let doc = harness.build(&assembler, "test:1").await.unwrap();
    assert_eq!(text(&doc, "extracted_text").as_deref(), Some("Issue 1 Front page"));
}

#[tokio::test]
async fn test_repeated_builds_are_identical() {
    let harness = Harness::new(&[(
        "test:1",
        vec![("MODS", "<mods/>".to_string()), ("PDF", "1234".to_string())],
    )]);
    let extractors = ExtractorSet::new().with(StreamKind::Bibliographic, Arc::new(Echo("abstract")));
    let (assembler, _) = harness.assembler(extractors, Arc::new(NoOverrides)).await;

    let first = UpdateCommand::Add(harness.build(&assembler, "test:1").await.unwrap()).to_body();
    let second = UpdateCommand::Add(harness.build(&assembler, "test:1").await.unwrap()).to_body();
    assert_eq!(first.to_string(), second.to_string());
}
