//! Tracking error types.

use courier_sync::SyncError;
use courier_types::DecodeError;
use thiserror::Error;

pub type TrackingResult<T> = Result<T, TrackingError>;

/// Failures reported by the device position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,

    #[error("position source closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("unexpected row shape: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid photo data: {0}")]
    InvalidPhoto(String),
}
