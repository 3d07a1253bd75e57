//! Error types for storage resolution

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Storage resolution errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object exists for the identifier
    #[error("Object not found: {pid}")]
    NotFound { pid: String },

    /// The object exists but has been tombstoned
    #[error("Object deleted: {pid}")]
    Deleted { pid: String },

    /// The object exists but the named file does not
    #[error("File {name} not found on {pid}")]
    FileNotFound { pid: String, name: String },

    /// The storage service answered with an unexpected status
    #[error("Storage service error (status {status}) for {url}")]
    Service { url: String, status: u16 },

    /// An on-disk inventory is unreadable or inconsistent
    #[error("Invalid inventory for {pid}: {message}")]
    InvalidInventory { pid: String, message: String },

    /// A storage response could not be decoded
    #[error("Failed to parse storage response: {0}")]
    Parse(String),

    /// A relationship graph stream is not well-formed RDF/XML
    #[error("Invalid relationship graph: {0}")]
    Rdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl StorageError {
    /// True for errors that mean the object itself is gone
    pub fn is_missing_object(&self) -> bool {
        matches!(self, StorageError::NotFound { .. } | StorageError::Deleted { .. })
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, StorageError::FileNotFound { .. })
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StorageError::FileNotFound {
            pid: "test:123".to_string(),
            name: "MODS".to_string(),
        };
        assert_eq!(error.to_string(), "File MODS not found on test:123");
    }

    #[test]
    fn test_missing_object_classification() {
        assert!(StorageError::NotFound { pid: "a".into() }.is_missing_object());
        assert!(StorageError::Deleted { pid: "a".into() }.is_missing_object());
        assert!(!StorageError::Parse("bad".into()).is_missing_object());
        assert!(!StorageError::Service {
            url: "u".into(),
            status: 500
        }
        .is_missing_object());
    }
}
