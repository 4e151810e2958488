//! Buffered mutations.

use crate::Row;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kind of mutation a `PendingOperation` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    pub fn requires_target(&self) -> bool {
        !matches!(self, OperationKind::Insert)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mutation awaiting replay against the remote store.
///
/// Construction validates the operation, so a value of this type is always
/// replayable: Update and Delete carry a non-empty `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Time-ordered identifier, used to remove exactly the applied entries.
    pub id: Uuid,
    pub table: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub payload: Row,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(
        table: impl Into<String>,
        kind: OperationKind,
        payload: Row,
        target_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        Self::with_timestamp(table, kind, payload, target_id, Utc::now())
    }

    pub fn with_timestamp(
        table: impl Into<String>,
        kind: OperationKind,
        payload: Row,
        target_id: Option<String>,
        enqueued_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let op = Self {
            id: Uuid::now_v7(),
            table: table.into(),
            kind,
            payload,
            target_id: target_id.filter(|id| !id.is_empty()),
            enqueued_at,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn insert(table: impl Into<String>, payload: Row) -> Result<Self, ValidationError> {
        Self::new(table, OperationKind::Insert, payload, None)
    }

    pub fn update(
        table: impl Into<String>,
        target_id: impl Into<String>,
        patch: Row,
    ) -> Result<Self, ValidationError> {
        Self::new(table, OperationKind::Update, patch, Some(target_id.into()))
    }

    pub fn delete(
        table: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::new(table, OperationKind::Delete, Row::new(), Some(target_id.into()))
    }

    /// Checks the invariants every queued operation must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::EmptyTable);
        }
        if self.kind.requires_target() && self.target_id.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingTargetId(self.kind));
        }
        Ok(())
    }
}
