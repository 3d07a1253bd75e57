//! # Document Assembly
//!
//! Turns resolved storage objects into index documents.
//!
//! ## Overview
//!
//! - Assembling the flat index document in a fixed step order
//! - The extractor contract that per-schema rule sets implement
//! - Collection hierarchy lookups with shared caching
//! - Resource-type overrides and the invalid-date log
//! - Incremental archive listings for `ZIP` streams
//!
//! ## Components
//!
//! - **Documents** (`document`): `IndexDocument`, `AtomicPatch`, `UpdateCommand`
//! - **Extractors** (`extractor`): `MetadataExtractor` and the per-stream registry
//! - **Assembler** (`assembler`): `DocumentAssembler`
//! - **Zip indexer** (`zip_indexer`): staleness gate and member listing

pub mod assembler;
pub mod collections;
pub mod db;
pub mod document;
pub mod error;
pub mod extractor;
pub mod reporter;
pub mod resource_types;
pub mod text;
pub mod zip_indexer;

pub use assembler::{DisplayIdentities, DocumentAssembler, DATE_FIELD, RESOURCE_TYPE_FIELD};
pub use collections::{CollectionLookup, HttpCollectionLookup};
pub use db::{create_pool, DatabaseConfig};
pub use document::{AtomicPatch, DocumentSnapshot, FieldMap, FieldValue, IndexDocument, UpdateCommand};
pub use error::{MetadataError, Result};
pub use extractor::{ExtractError, Extraction, ExtractorSet, MetadataExtractor, StreamKind};
pub use reporter::{InvalidDateReporter, SqliteInvalidDateReporter};
pub use resource_types::{NoOverrides, ResourceTypeOverrides, SqliteResourceTypes};
pub use zip_indexer::ZipIndexer;
