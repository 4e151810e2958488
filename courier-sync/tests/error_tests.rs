use courier_storage::StorageError;
use courier_sync::SyncError;
use courier_types::{OperationKind, ValidationError};

#[test]
fn validation_error_display() {
    let err = SyncError::from(ValidationError::MissingTargetId(OperationKind::Update));
    assert_eq!(err.to_string(), "invalid operation: update operations require a target id");
}

#[test]
fn storage_error_display() {
    let err = SyncError::from(StorageError::LockPoisoned);
    assert_eq!(err.to_string(), "local storage failed: storage lock poisoned");
}

#[test]
fn remote_error_display() {
    let err = SyncError::Remote {
        status: 401,
        message: "JWT expired".into(),
    };
    assert_eq!(err.to_string(), "remote store rejected request (401): JWT expired");
}

#[test]
fn unfiltered_mutation_display() {
    let err = SyncError::UnfilteredMutation {
        verb: "delete",
        table: "deliveries".into(),
    };
    assert_eq!(err.to_string(), "refusing unfiltered delete on deliveries");
}

#[test]
fn worker_stopped_display() {
    assert_eq!(SyncError::WorkerStopped.to_string(), "sync worker not running");
}

#[test]
fn remote_classification() {
    assert!(SyncError::Remote { status: 500, message: String::new() }.is_remote());
    assert!(SyncError::Offline.is_remote());
    assert!(!SyncError::Config("x".into()).is_remote());
    assert!(!SyncError::from(StorageError::LockPoisoned).is_remote());
    assert!(!SyncError::from(ValidationError::EmptyTable).is_remote());
}
