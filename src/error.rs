use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Storage error: {0}")]
    Storage(#[from] core_storage::StorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Failure queue holds {failed} jobs (limit {limit}); not enqueueing more")]
    FailureQueueFull { failed: u64, limit: u64 },
}

pub type Result<T> = std::result::Result<T, IndexerError>;
