//! Sync error types.

use courier_storage::StorageError;
use courier_types::{DecodeError, ValidationError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while applying or queueing mutations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid operation: {0}")]
    Validation(#[from] ValidationError),

    #[error("local storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("remote store rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected row shape: {0}")]
    Decode(#[from] DecodeError),

    #[error("refusing unfiltered {verb} on {table}")]
    UnfilteredMutation { verb: &'static str, table: String },

    #[error("device is offline")]
    Offline,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error("sync worker not running")]
    WorkerStopped,
}

impl SyncError {
    /// True for failures of the remote store or the network path to it.
    ///
    /// These are the failures the queue recovers from by replaying later.
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Remote { .. } | SyncError::Http(_) | SyncError::Offline)
    }
}
