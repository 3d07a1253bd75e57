//! Metadata Extractor Contract
//!
//! Per-schema field extraction (bibliographic, Darwin Core, TEI, rights,
//! technical, relationship vocabularies, deposit records) lives outside this
//! crate. The assembler only sees the [`MetadataExtractor`] trait: raw stream
//! bytes in, a flat field map out.
//!
//! ## Usage
//!
//! ```ignore
//! let extractors = ExtractorSet::new()
//!     .with(StreamKind::Bibliographic, Arc::new(ModsExtractor::default()))
//!     .with(StreamKind::Rights, Arc::new(RightsExtractor::default()));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::document::{FieldMap, FieldValue};

/// Why an extractor rejected its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// An optional part of the document could not be read
    #[error("Malformed content: {0}")]
    Malformed(String),

    /// The document as a whole is unusable
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Fields pulled out of one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub fields: FieldMap,
    /// Set by bibliographic extractors when a date could not be parsed
    pub has_invalid_date: bool,
}

impl Extraction {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            has_invalid_date: false,
        }
    }

    pub fn with_invalid_date(mut self) -> Self {
        self.has_invalid_date = true;
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Text values of a field, scalar or list
    pub fn texts(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .map(|value| value.texts().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Stream bytes to fields. Implementations must be pure.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError>;
}

/// The stream families an extractor can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// `RELS-EXT` facets beyond what the core derives itself
    Relationships,
    /// `irMetadata` deposit records
    Deposit,
    /// `rightsMetadata`
    Rights,
    /// `FITS` technical metadata
    Technical,
    /// `MODS`
    Bibliographic,
    /// `DWC`
    DarwinCore,
    /// `TEI`
    Tei,
}

impl StreamKind {
    /// Stream id the extractor reads
    pub fn stream_id(&self) -> &'static str {
        match self {
            StreamKind::Relationships => "RELS-EXT",
            StreamKind::Deposit => "irMetadata",
            StreamKind::Rights => "rightsMetadata",
            StreamKind::Technical => "FITS",
            StreamKind::Bibliographic => "MODS",
            StreamKind::DarwinCore => "DWC",
            StreamKind::Tei => "TEI",
        }
    }
}

/// Registered extractors by stream family; missing ones are skipped
#[derive(Clone, Default)]
pub struct ExtractorSet {
    extractors: HashMap<StreamKind, Arc<dyn MetadataExtractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: StreamKind, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractors.insert(kind, extractor);
        self
    }

    pub fn get(&self, kind: StreamKind) -> Option<&Arc<dyn MetadataExtractor>> {
        self.extractors.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

/// Extractor returning canned fields, for tests and wiring checks
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    extraction: Extraction,
}

impl StaticExtractor {
    pub fn new(extraction: Extraction) -> Self {
        Self { extraction }
    }
}

impl MetadataExtractor for StaticExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<Extraction, ExtractError> {
        Ok(self.extraction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_texts() {
        let extraction = Extraction::default()
            .field("display", vec!["BDR_PUBLIC".to_string(), "BROWN:COMMUNITY".to_string()])
            .field("depositor", "Jo Smith");

        assert_eq!(extraction.texts("display"), vec!["BDR_PUBLIC", "BROWN:COMMUNITY"]);
        assert_eq!(extraction.texts("depositor"), vec!["Jo Smith"]);
        assert!(extraction.texts("missing").is_empty());
    }

    #[test]
    fn test_extractor_set_lookup() {
        let set = ExtractorSet::new().with(
            StreamKind::Bibliographic,
            Arc::new(StaticExtractor::default()),
        );
        assert!(set.get(StreamKind::Bibliographic).is_some());
        assert!(set.get(StreamKind::Tei).is_none());
        assert_eq!(StreamKind::Deposit.stream_id(), "irMetadata");
    }
}
