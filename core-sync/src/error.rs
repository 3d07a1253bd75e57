use bridge_traits::error::BridgeError;
use core_metadata::MetadataError;
use core_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid job action: {0}")]
    InvalidAction(String),

    #[error("Invalid queue tier: {0}")]
    InvalidTier(String),

    #[error("Job timed out after {0:?}")]
    Timeout(Duration),

    #[error("Job task panicked: {0}")]
    Panicked(String),

    #[error("Search index rejected {action} for {pid} (status {status}): {body}")]
    IndexWrite {
        pid: String,
        action: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected search index response: {0}")]
    IndexResponse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue database holds an unreadable row: {0}")]
    CorruptQueue(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
