use crate::operation::OperationKind;
use thiserror::Error;

/// A mutation that can never be applied, rejected before it reaches the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} operations require a target id")]
    MissingTargetId(OperationKind),

    #[error("operation table name must not be empty")]
    EmptyTable,
}

/// Failure to turn a remote row into a typed value (or back).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown delivery status: {0}")]
    UnknownStatus(String),

    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
