use core_storage::StorageError;
use thiserror::Error;

use crate::extractor::ExtractError;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Extraction of {stream} failed: {source}")]
    Extraction {
        stream: String,
        #[source]
        source: ExtractError,
    },

    #[error("Collection lookup for {id} failed: {message}")]
    CollectionLookup { id: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid XML: {0}")]
    Xml(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl From<sqlx::Error> for MetadataError {
    fn from(e: sqlx::Error) -> Self {
        MetadataError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
