//! # Document Assembler
//!
//! Builds the index document for one object in a fixed order:
//!
//! 1. Storage facts (identifier, timestamps, file profiles and sizes)
//! 2. Relationship graph facts
//! 3. Deposit metadata
//! 4. Rights metadata and the derived display flags
//! 5. Technical metadata
//! 6. Extracted text or OCR
//! 7. Descriptive metadata: bibliographic, then Darwin Core, then TEI
//! 8. Defaults for the canonical date and the resource type
//!
//! Every step adds fields first-writer-wins, so an earlier step is never
//! overwritten by a later one. The only explicit overwrites are the
//! resource-type override table and the Darwin Core title fallback.

use bytes::Bytes;
use core_storage::relations::IMAGE_TYPE;
use core_storage::{
    normalize_partial_date, to_index_string, AncestorLinks, InheritanceResolver, ObjectId,
    Relationships, StorageObject, StorageResolver,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::collections::CollectionLookup;
use crate::document::{FieldMap, IndexDocument};
use crate::error::{MetadataError, Result};
use crate::extractor::{ExtractError, Extraction, ExtractorSet, StreamKind};
use crate::reporter::InvalidDateReporter;
use crate::resource_types::{vocabulary_value, ResourceTypeOverrides};
use crate::text::{indexable_text, EXTRACTED_TEXT, OCR};

pub const DATE_FIELD: &str = "date_dsi";
pub const RESOURCE_TYPE_FIELD: &str = "resource_type_ssi";
pub const PRIMARY_TITLE_FIELD: &str = "primary_title";
pub const DWC_TITLE_FIELD: &str = "dwc_accepted_name_usage_ssi";
pub const BASIS_OF_RECORD_FIELD: &str = "dwc_basis_of_record_ssi";
pub const TYPE_OF_RESOURCE_FIELD: &str = "mods_type_of_resource";
pub const RIGHTS_DISPLAY_FIELD: &str = "display";
/// Collection ids a relationship extractor may report for name lookup
pub const REL_COLLECTION_ID_FIELD: &str = "rel_collection_id_ssim";

pub const DEFAULT_RESOURCE_TYPE: &str = "other";
const SPECIMEN_RESOURCE_TYPE: &str = "realia";
const TEI_RESOURCE_TYPE: &str = "text_resources";

/// Identities that grant public or institution-only display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayIdentities {
    pub public: String,
    pub institution: String,
}

impl Default for DisplayIdentities {
    fn default() -> Self {
        Self {
            public: "BDR_PUBLIC".to_string(),
            institution: "BROWN:COMMUNITY:ALL".to_string(),
        }
    }
}

/// Public, institution-only and private display flags; exactly one is set
pub fn display_flags(display: &[String], identities: &DisplayIdentities) -> [(&'static str, bool); 3] {
    let public = display.iter().any(|d| *d == identities.public);
    let institution = !public && display.iter().any(|d| *d == identities.institution);
    [
        ("display_public_bsi", public),
        ("display_institution_bsi", institution),
        ("display_private_bsi", !public && !institution),
    ]
}

/// Storage-intrinsic fields of an object
pub fn storage_fields(object: &StorageObject) -> FieldMap {
    let created = to_index_string(&object.created);
    let modified = to_index_string(&object.modified);

    let profiles: BTreeMap<&str, serde_json::Value> = object
        .active_files()
        .map(|(name, profile)| {
            (
                name,
                json!({
                    "mimeType": profile.mimetype,
                    "size": profile.size,
                    "checksum": profile.checksum,
                    "checksumType": profile.checksum_type,
                    "lastModified": to_index_string(&profile.last_modified),
                }),
            )
        })
        .collect();
    let total_size = object.total_size();

    let mut fields = FieldMap::new();
    fields.insert("pid".into(), object.id.to_string().into());
    fields.insert("fed_created_dsi".into(), created.clone().into());
    fields.insert("object_created_dsi".into(), created.into());
    fields.insert("fed_last_modified_dsi".into(), modified.clone().into());
    fields.insert("object_last_modified_dsi".into(), modified.into());
    fields.insert("storage_location_ssi".into(), object.location.clone().into());
    fields.insert("storage_backend_ssi".into(), object.kind.as_str().into());
    fields.insert(
        "datastreams_ssi".into(),
        serde_json::to_string(&profiles).unwrap_or_default().into(),
    );
    fields.insert("ds_ids_ssim".into(), object.active_file_names().into());
    fields.insert("all_ds_ids_ssim".into(), object.all_file_names().into());
    fields.insert("fed_object_size_lsi".into(), total_size.into());
    fields.insert("object_size_lsi".into(), total_size.into());
    fields
}

/// Fields the core derives from the relationship graph itself
pub fn relationship_fields(relationships: &Relationships) -> FieldMap {
    let ids = |pids: &[ObjectId]| -> Vec<String> { pids.iter().map(ToString::to_string).collect() };
    let object_type = relationships.object_type();

    let mut fields = FieldMap::new();
    fields.insert(
        "rel_content_models_ssim".into(),
        relationships.content_models.clone().into(),
    );
    fields.insert("rel_object_type_ssi".into(), object_type.clone().into());
    fields.insert("rel_is_part_of_ssim".into(), ids(&relationships.part_of).into());
    fields.insert(
        "rel_is_derivation_of_ssim".into(),
        ids(&relationships.derivation_of).into(),
    );
    fields.insert("rel_is_member_of_ssim".into(), ids(&relationships.member_of).into());
    if object_type == IMAGE_TYPE {
        fields.insert("iiif_resource_bsi".into(), true.into());
    }
    fields.insert("object_type".into(), object_type.into());
    fields
}

/// Collaborators of the assembler
pub struct DocumentAssembler {
    resolver: Arc<StorageResolver>,
    inheritance: Arc<InheritanceResolver>,
    extractors: ExtractorSet,
    collections: Arc<dyn CollectionLookup>,
    overrides: Arc<dyn ResourceTypeOverrides>,
    reporter: Arc<dyn InvalidDateReporter>,
    display: DisplayIdentities,
}

impl DocumentAssembler {
    pub fn new(
        inheritance: Arc<InheritanceResolver>,
        extractors: ExtractorSet,
        collections: Arc<dyn CollectionLookup>,
        overrides: Arc<dyn ResourceTypeOverrides>,
        reporter: Arc<dyn InvalidDateReporter>,
    ) -> Self {
        Self {
            resolver: inheritance.resolver().clone(),
            inheritance,
            extractors,
            collections,
            overrides,
            reporter,
            display: DisplayIdentities::default(),
        }
    }

    pub fn with_display_identities(mut self, display: DisplayIdentities) -> Self {
        self.display = display;
        self
    }

    /// Assemble the full document for a resolved object
    #[instrument(skip_all, fields(pid = %object.id))]
    pub async fn build(
        &self,
        object: &StorageObject,
        relationships: Option<&Relationships>,
    ) -> Result<IndexDocument> {
        let mut doc = IndexDocument::new();

        doc.add_all(storage_fields(object));

        if let Some(relationships) = relationships {
            self.add_relationships(&mut doc, object, relationships).await?;
        }
        self.add_deposit(&mut doc, object).await?;
        self.add_rights(&mut doc, object).await?;
        self.add_technical(&mut doc, object).await?;
        self.add_extracted_text(&mut doc, object).await;

        let links = relationships.map(Relationships::ancestors).unwrap_or_default();
        let sources = self.add_descriptive(&mut doc, object, &links).await?;

        self.apply_defaults(&mut doc, object, sources).await?;

        debug!(fields = doc.len(), "Assembled document");
        Ok(doc)
    }

    fn extractor_output(&self, kind: StreamKind, bytes: &[u8]) -> std::result::Result<Option<Extraction>, ExtractError> {
        match self.extractors.get(kind) {
            Some(extractor) => extractor.extract(bytes).map(Some),
            None => {
                debug!(stream = kind.stream_id(), "No extractor registered");
                Ok(None)
            }
        }
    }

    /// Run the extractor for a stream on the object itself
    async fn extract_own(&self, object: &StorageObject, kind: StreamKind) -> Result<Option<Extraction>> {
        let stream = kind.stream_id();
        if !object.is_active(stream) || self.extractors.get(kind).is_none() {
            return Ok(None);
        }
        let bytes = match self.resolver.get_file(object, stream).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_file_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.extractor_output(kind, &bytes)
            .map_err(|source| MetadataError::Extraction {
                stream: stream.to_string(),
                source,
            })
    }

    async fn add_relationships(
        &self,
        doc: &mut IndexDocument,
        object: &StorageObject,
        relationships: &Relationships,
    ) -> Result<()> {
        doc.add_all(relationship_fields(relationships));

        if let Some(extraction) = self.extract_own(object, StreamKind::Relationships).await? {
            let collection_ids = extraction.texts(REL_COLLECTION_ID_FIELD);
            if !collection_ids.is_empty() {
                let names = self.collections.names_for(&collection_ids).await?;
                doc.add("rel_collection_name_ssim", names);
            }
            doc.add_all(extraction.fields);
        }
        Ok(())
    }

    async fn add_deposit(&self, doc: &mut IndexDocument, object: &StorageObject) -> Result<()> {
        let Some(mut extraction) = self.extract_own(object, StreamKind::Deposit).await? else {
            return Ok(());
        };

        for date_field in ["deposit_date", "collection_date"] {
            if let Some(value) = extraction.fields.remove(date_field) {
                if let Some(date) = value.as_text().and_then(normalize_partial_date) {
                    doc.add(date_field, date);
                }
            }
        }

        let collection_ids = extraction.texts("ir_collection_id");
        if !collection_ids.is_empty() {
            let names = self.collections.names_for(&collection_ids).await?;
            doc.add("ir_collection_name", names);
        }
        doc.add_all(extraction.fields);
        Ok(())
    }

    async fn add_rights(&self, doc: &mut IndexDocument, object: &StorageObject) -> Result<()> {
        let Some(extraction) = self.extract_own(object, StreamKind::Rights).await? else {
            return Ok(());
        };

        let display = extraction.texts(RIGHTS_DISPLAY_FIELD);
        doc.add_all(extraction.fields);
        for (field, flag) in display_flags(&display, &self.display) {
            doc.add(field, flag);
        }
        Ok(())
    }

    async fn add_technical(&self, doc: &mut IndexDocument, object: &StorageObject) -> Result<()> {
        match self.extract_own(object, StreamKind::Technical).await {
            Ok(Some(extraction)) => doc.add_all(extraction.fields),
            Ok(None) => {}
            Err(MetadataError::Extraction {
                source: ExtractError::Malformed(message),
                ..
            }) => {
                warn!(pid = %object.id, message = %message, "Skipping malformed technical metadata");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn add_extracted_text(&self, doc: &mut IndexDocument, object: &StorageObject) {
        let Some(stream) = [EXTRACTED_TEXT, OCR].into_iter().find(|s| object.is_active(s)) else {
            return;
        };

        let content = match self.resolver.get_file_with_content_type(object, stream).await {
            Ok(content) => content,
            Err(e) => {
                warn!(pid = %object.id, stream, error = %e, "Could not fetch extracted text");
                return;
            }
        };
        match indexable_text(&content.bytes, content.content_type.as_deref()) {
            Ok(text) => {
                doc.add("extracted_text", text);
            }
            Err(e) => warn!(pid = %object.id, stream, error = %e, "Could not process extracted text"),
        }
    }

    async fn inherited(
        &self,
        object: &StorageObject,
        links: &AncestorLinks,
        kind: StreamKind,
    ) -> Result<Option<Bytes>> {
        if self.extractors.get(kind).is_none() {
            return Ok(None);
        }
        Ok(self
            .inheritance
            .get_metadata_bytes(object, links, kind.stream_id())
            .await?)
    }

    fn extract_inherited(&self, kind: StreamKind, bytes: &[u8]) -> Result<Extraction> {
        self.extractor_output(kind, bytes)
            .map_err(|source| MetadataError::Extraction {
                stream: kind.stream_id().to_string(),
                source,
            })
            .map(Option::unwrap_or_default)
    }

    async fn add_descriptive(
        &self,
        doc: &mut IndexDocument,
        object: &StorageObject,
        links: &AncestorLinks,
    ) -> Result<DescriptiveSources> {
        let mut sources = DescriptiveSources::default();

        if let Some(bytes) = self.inherited(object, links, StreamKind::Bibliographic).await? {
            sources.bibliographic = true;
            let extraction = self.extract_inherited(StreamKind::Bibliographic, &bytes)?;
            if extraction.has_invalid_date {
                if let Err(e) = self.reporter.report(&object.id).await {
                    warn!(pid = %object.id, error = %e, "Failed to record invalid date");
                }
            }
            doc.add_all(extraction.fields);
        }

        if let Some(bytes) = self.inherited(object, links, StreamKind::DarwinCore).await? {
            let extraction = self.extract_inherited(StreamKind::DarwinCore, &bytes)?;
            doc.add_all(extraction.fields);
            if !doc.contains(PRIMARY_TITLE_FIELD) {
                if let Some(title) = doc.get_text(DWC_TITLE_FIELD).map(str::to_string) {
                    doc.add(PRIMARY_TITLE_FIELD, title);
                }
            }
        }

        if let Some(bytes) = self.inherited(object, links, StreamKind::Tei).await? {
            sources.tei = true;
            let extraction = self.extract_inherited(StreamKind::Tei, &bytes)?;
            doc.add_all(extraction.fields);
        }

        Ok(sources)
    }

    async fn apply_defaults(
        &self,
        doc: &mut IndexDocument,
        object: &StorageObject,
        sources: DescriptiveSources,
    ) -> Result<()> {
        if !doc.contains(DATE_FIELD) {
            doc.add(DATE_FIELD, to_index_string(&object.created));
        }

        if let Some(resource_type) = self.overrides.lookup(&object.id).await? {
            doc.set(RESOURCE_TYPE_FIELD, resource_type);
            return Ok(());
        }
        if doc.contains(RESOURCE_TYPE_FIELD) {
            return Ok(());
        }

        let specimen = doc
            .get_text(BASIS_OF_RECORD_FIELD)
            .map(|basis| basis.replace(' ', "").eq_ignore_ascii_case("preservedspecimen"))
            .unwrap_or(false);
        let vocabulary = doc
            .get(TYPE_OF_RESOURCE_FIELD)
            .and_then(|value| value.texts().into_iter().find_map(vocabulary_value));

        let resource_type = if specimen {
            SPECIMEN_RESOURCE_TYPE
        } else if let Some(value) = vocabulary {
            value
        } else if sources.tei && !sources.bibliographic {
            TEI_RESOURCE_TYPE
        } else {
            DEFAULT_RESOURCE_TYPE
        };
        doc.add(RESOURCE_TYPE_FIELD, resource_type);
        Ok(())
    }
}

/// Which descriptive streams contributed to a document
#[derive(Debug, Clone, Copy, Default)]
struct DescriptiveSources {
    bibliographic: bool,
    tei: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities() -> DisplayIdentities {
        DisplayIdentities {
            public: "PUBLIC".to_string(),
            institution: "CAMPUS".to_string(),
        }
    }

    fn flags(display: &[&str]) -> Vec<bool> {
        let display: Vec<String> = display.iter().map(|d| d.to_string()).collect();
        display_flags(&display, &identities())
            .iter()
            .map(|(_, flag)| *flag)
            .collect()
    }

    #[test]
    fn test_exactly_one_display_flag() {
        for display in [
            vec![],
            vec!["PUBLIC"],
            vec!["CAMPUS"],
            vec!["PUBLIC", "CAMPUS"],
            vec!["someone@example.edu"],
        ] {
            let set = flags(&display).into_iter().filter(|f| *f).count();
            assert_eq!(set, 1, "display {:?}", display);
        }
        assert_eq!(flags(&["CAMPUS", "PUBLIC"]), vec![true, false, false]);
        assert_eq!(flags(&["CAMPUS"]), vec![false, true, false]);
        assert_eq!(flags(&[]), vec![false, false, true]);
    }
}
