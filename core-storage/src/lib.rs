//! # Storage Resolution
//!
//! Turns an object identifier into backend-agnostic object facts and file
//! bytes.
//!
//! ## Overview
//!
//! Objects live either in a local content-addressable (OCFL) store or behind
//! the legacy HTTP file-listing service. This crate hides that split:
//! - Picking a backend per identifier by probing for a local inventory
//! - Parsing OCFL inventories, including tombstone detection
//! - Caching ancestor listings and file bytes under version-stamped keys
//! - Reading relationship graphs and the ancestor links derived from them
//! - Borrowing metadata streams from direct ancestors
//!
//! ## Components
//!
//! - **Data model** (`types`): `ObjectId`, `StorageObject`, `FileProfile`
//! - **Backends** (`backend`, `ocfl`, `legacy`): the `StorageBackend` capability and its two implementations
//! - **Cache** (`cache`): version-stamped keys over the shared cache store
//! - **Resolver** (`resolver`): backend selection plus caching
//! - **Relationships** (`rdf`, `relations`): RDF/XML triples, content models, ancestor links
//! - **Inheritance** (`inheritance`): one-hop metadata borrowing

pub mod backend;
pub mod cache;
pub mod error;
pub mod inheritance;
pub mod legacy;
pub mod mime;
pub mod ocfl;
pub mod rdf;
pub mod relations;
pub mod resolver;
pub mod timestamp;
pub mod types;

pub use backend::{BackendSelector, ContentStream, FileContent, StorageBackend};
pub use cache::{CacheStatsSnapshot, VersionedCache};
pub use error::{Result, StorageError};
pub use inheritance::InheritanceResolver;
pub use legacy::LegacyHttpBackend;
pub use ocfl::{Inventory, OcflBackend};
pub use relations::{AncestorLinks, Relationships};
pub use resolver::StorageResolver;
pub use timestamp::{normalize_partial_date, parse_utc, to_index_string};
pub use types::{BackendKind, FileProfile, FileState, ObjectId, StorageObject};
