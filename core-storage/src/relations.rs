//! Relationship graph of a stored object
//!
//! Parsed from the object's `RELS-EXT` stream. Exposes the content models,
//! the derived object type and the ancestor links used for metadata
//! inheritance and cascading.

use crate::error::Result;
use crate::rdf::{RdfGraph, RdfObject};
use crate::types::ObjectId;

pub const RELS_EXT: &str = "RELS-EXT";
pub const RELS_INT: &str = "RELS-INT";

pub const IS_PART_OF: &str = "info:fedora/fedora-system:def/relations-external#isPartOf";
pub const IS_DERIVATION_OF: &str = "info:fedora/fedora-system:def/relations-external#isDerivationOf";
pub const IS_MEMBER_OF: &str = "info:fedora/fedora-system:def/relations-external#isMemberOf";
pub const HAS_MODEL: &str = "info:fedora/fedora-system:def/model#hasModel";
pub const DOWNLOAD_FILENAME: &str = "info:fedora/fedora-system:def/model#downloadFilename";

/// Object type given to objects whose content models map to nothing
pub const UNDETERMINED: &str = "undetermined";
pub const IMAGE_TYPE: &str = "image";

/// Bumped whenever [`OBJECT_TYPE_TABLE`] changes meaning
pub const OBJECT_TYPE_TABLE_REVISION: u32 = 1;

/// Content models that never determine an object type
const IGNORED_MODELS: &[&str] = &["commonMetadata", "archiveMETS"];

/// Content-model token to object type, checked in order
pub const OBJECT_TYPE_TABLE: &[(&[&str], &str)] = &[
    (&["bdr-collection"], "bdr-collection"),
    (
        &["image", "jp2", "image-compound", "jpg", "png", "masterImage"],
        IMAGE_TYPE,
    ),
    (&["audioMaster", "mp3"], "audio"),
    (&["mp4", "mov", "m4v"], "video"),
];

/// Map content-model tokens to a single object type
pub fn object_type_for<S: AsRef<str>>(content_models: &[S]) -> String {
    let models: Vec<&str> = content_models
        .iter()
        .map(AsRef::as_ref)
        .filter(|m| !IGNORED_MODELS.contains(m))
        .collect();

    for (tokens, object_type) in OBJECT_TYPE_TABLE {
        if models.iter().any(|m| tokens.contains(m)) {
            return (*object_type).to_string();
        }
    }

    models
        .first()
        .map(|m| (*m).to_string())
        .unwrap_or_else(|| UNDETERMINED.to_string())
}

/// First-match ancestors of an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorLinks {
    pub parent: Option<ObjectId>,
    pub original: Option<ObjectId>,
}

impl AncestorLinks {
    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.original.is_none()
    }
}

/// Typed view over an object's `RELS-EXT`
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    pub content_models: Vec<String>,
    pub part_of: Vec<ObjectId>,
    pub derivation_of: Vec<ObjectId>,
    pub member_of: Vec<ObjectId>,
    pub graph: RdfGraph,
}

impl Relationships {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_graph(RdfGraph::parse(bytes)?))
    }

    pub fn from_graph(graph: RdfGraph) -> Self {
        let ids = |predicate: &str| -> Vec<ObjectId> {
            graph
                .objects(predicate)
                .filter_map(|o| ObjectId::from_uri(o.as_str()))
                .collect()
        };

        let content_models = graph
            .objects(HAS_MODEL)
            .map(RdfObject::as_str)
            .map(|uri| uri.rsplit(':').next().unwrap_or(uri).to_string())
            .collect();

        Self {
            content_models,
            part_of: ids(IS_PART_OF),
            derivation_of: ids(IS_DERIVATION_OF),
            member_of: ids(IS_MEMBER_OF),
            graph,
        }
    }

    pub fn object_type(&self) -> String {
        object_type_for(&self.content_models)
    }

    pub fn ancestors(&self) -> AncestorLinks {
        AncestorLinks {
            parent: self.part_of.first().cloned(),
            original: self.derivation_of.first().cloned(),
        }
    }

    /// Image objects that belong to a parent publish an image flag on it
    pub fn image_parent(&self) -> Option<&ObjectId> {
        if self.object_type() == IMAGE_TYPE {
            self.part_of.first()
        } else {
            None
        }
    }

    pub fn is_image_child(&self) -> bool {
        self.image_parent().is_some()
    }
}
