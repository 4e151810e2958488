//! Offline sync engine.
//!
//! Writes go online-first. When the device is offline, or the remote store
//! fails, the mutation is appended to a durable FIFO queue instead. A drain
//! pass replays the queue front to back, attempting every entry exactly once
//! and keeping only the ones that failed.
//!
//! The queue is owned by the engine behind an async mutex. Every
//! read-modify-persist of the queue happens under that lock, so an enqueue
//! that lands while a drain is replaying is never overwritten by the drain's
//! result.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::remote::{Query, RemoteStore};
use chrono::{DateTime, Utc};
use courier_storage::{QueueStore, StorageResult};
use courier_types::{OperationKind, PendingOperation, Row, ValidationError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Field set on provisional rows returned for offline inserts.
pub const OFFLINE_MARKER: &str = "_offline";

/// Prefix of locally generated ids on provisional rows.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// What `perform_operation` did with a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Applied remotely; carries the row the store returned (empty if none).
    Applied(Row),
    /// Delete applied remotely.
    Deleted,
    /// Insert queued offline; carries the payload with a temporary id and
    /// the offline marker.
    Provisional(Row),
    /// Update or delete queued offline.
    AcceptedOffline,
}

impl OperationOutcome {
    pub fn is_offline(&self) -> bool {
        matches!(self, OperationOutcome::Provisional(_) | OperationOutcome::AcceptedOffline)
    }

    pub fn row(&self) -> Option<&Row> {
        match self {
            OperationOutcome::Applied(row) | OperationOutcome::Provisional(row) => Some(row),
            OperationOutcome::Deleted | OperationOutcome::AcceptedOffline => None,
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub applied: usize,
    pub failed: usize,
    /// Queue length after the pass, including entries added during it.
    pub remaining: usize,
    /// The pass did not run (offline, or another pass in flight).
    pub skipped: bool,
}

impl DrainReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Snapshot of engine state for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Events emitted by the engine for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// An operation was durably queued.
    Enqueued { id: Uuid, table: String, pending: usize },
    /// A drain pass started over `pending` operations.
    DrainStarted { pending: usize },
    /// A queued operation failed to replay and stays queued.
    OperationFailed { id: Uuid, table: String, error: String },
    /// A drain pass finished.
    DrainCompleted { applied: usize, failed: usize, remaining: usize },
    /// Connectivity flipped.
    ConnectivityChanged { online: bool },
}

#[derive(Default)]
struct StatusState {
    last_sync_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct EngineInner {
    remote: Arc<dyn RemoteStore>,
    store: QueueStore,
    connectivity: ConnectivityMonitor,
    queue: Mutex<Vec<PendingOperation>>,
    pending: AtomicUsize,
    draining: AtomicBool,
    /// The durable queue still holds operations a drain already applied.
    store_stale: AtomicBool,
    status: std::sync::Mutex<StatusState>,
    events: broadcast::Sender<SyncEvent>,
}

/// Handle to the offline sync engine. Clones share state.
#[derive(Clone)]
pub struct OfflineSyncEngine {
    inner: Arc<EngineInner>,
}

impl OfflineSyncEngine {
    /// Loads the persisted queue and last drain time, and returns a ready engine.
    pub async fn open(
        remote: Arc<dyn RemoteStore>,
        store: QueueStore,
        connectivity: ConnectivityMonitor,
    ) -> SyncResult<Self> {
        let loader = store.clone();
        let (queue, last_sync_at) =
            blocking(move || Ok((loader.load_queue()?, loader.last_sync()?))).await?;

        info!(pending = queue.len(), "sync engine opened");

        let (events, _) = broadcast::channel(256);
        Ok(Self {
            inner: Arc::new(EngineInner {
                remote,
                store,
                connectivity,
                pending: AtomicUsize::new(queue.len()),
                queue: Mutex::new(queue),
                draining: AtomicBool::new(false),
                store_stale: AtomicBool::new(false),
                status: std::sync::Mutex::new(StatusState {
                    last_sync_at,
                    last_error: None,
                }),
                events,
            }),
        })
    }

    /// Applies a mutation, or queues it when offline or when the remote fails.
    ///
    /// Validation failures are returned before anything is sent or queued.
    /// A failed direct attempt is queued and the original error returned.
    pub async fn perform_operation(
        &self,
        table: &str,
        kind: OperationKind,
        payload: Row,
        target_id: Option<String>,
    ) -> SyncResult<OperationOutcome> {
        let op = PendingOperation::new(table, kind, payload, target_id)?;

        if !self.is_online() {
            let outcome = offline_outcome(&op);
            debug!(table, %kind, "offline, queueing");
            self.add_to_sync_queue(op).await?;
            return Ok(outcome);
        }

        match apply_operation(self.inner.remote.as_ref(), &op).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(table, %kind, error = %err, "direct write failed, queueing for replay");
                self.record_error(&err);
                self.add_to_sync_queue(op).await?;
                Err(err)
            }
        }
    }

    /// Appends `op` to the durable queue, then drains if online.
    ///
    /// The append and its persistence are one step: if the store cannot be
    /// written, the operation is taken back out and `SyncError::Storage` is
    /// returned.
    pub async fn add_to_sync_queue(&self, op: PendingOperation) -> SyncResult<()> {
        op.validate()?;
        let (id, table) = (op.id, op.table.clone());

        let pending = {
            let mut queue = self.inner.queue.lock().await;
            queue.push(op);
            if let Err(err) = self.persist_queue(queue.clone()).await {
                queue.pop();
                self.record_error(&err);
                return Err(err);
            }
            self.inner.pending.store(queue.len(), Ordering::SeqCst);
            queue.len()
        };

        debug!(%id, table, pending, "operation queued");
        self.emit(SyncEvent::Enqueued { id, table, pending });

        if self.is_online() && !self.is_syncing() {
            if let Err(err) = self.process_sync_queue().await {
                warn!(error = %err, "drain after enqueue failed");
            }
        }
        Ok(())
    }

    /// Runs one drain pass.
    ///
    /// Returns `DrainReport::skipped()` when offline or when another pass is
    /// already running. Each queued operation is attempted once, front to
    /// back; failures are logged and stay queued in their original order.
    pub async fn process_sync_queue(&self) -> SyncResult<DrainReport> {
        if !self.is_online() {
            debug!("drain skipped: offline");
            return Ok(DrainReport::skipped());
        }
        let Some(_guard) = DrainGuard::acquire(&self.inner.draining) else {
            debug!("drain skipped: already in flight");
            return Ok(DrainReport::skipped());
        };

        let snapshot = self.inner.queue.lock().await.clone();
        if snapshot.is_empty() {
            if self.inner.store_stale.load(Ordering::SeqCst) {
                let queue = self.inner.queue.lock().await;
                if let Err(err) = self.persist_queue(queue.clone()).await {
                    self.record_error(&err);
                    return Err(err);
                }
            }
            return Ok(DrainReport::default());
        }

        info!(pending = snapshot.len(), "draining sync queue");
        self.emit(SyncEvent::DrainStarted { pending: snapshot.len() });

        let mut applied = HashSet::with_capacity(snapshot.len());
        let mut failed = 0;
        for op in &snapshot {
            match apply_operation(self.inner.remote.as_ref(), op).await {
                Ok(_) => {
                    applied.insert(op.id);
                }
                Err(err) => {
                    failed += 1;
                    warn!(
                        id = %op.id,
                        table = %op.table,
                        kind = %op.kind,
                        error = %err,
                        "queued operation failed, keeping it"
                    );
                    self.emit(SyncEvent::OperationFailed {
                        id: op.id,
                        table: op.table.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let finished_at = Utc::now();
        let remaining = {
            let mut queue = self.inner.queue.lock().await;
            let next: Vec<PendingOperation> = queue
                .iter()
                .filter(|op| !applied.contains(&op.id))
                .cloned()
                .collect();

            let store = self.inner.store.clone();
            let to_persist = next.clone();
            let persisted = blocking(move || {
                store.replace_queue(&to_persist)?;
                store.record_last_sync(finished_at)
            })
            .await;

            // Applied operations leave the in-memory queue even when the
            // durable copy could not be rewritten.
            *queue = next;
            self.inner.pending.store(queue.len(), Ordering::SeqCst);
            if let Err(err) = persisted {
                warn!(error = %err, "failed to persist drained queue");
                self.inner.store_stale.store(true, Ordering::SeqCst);
                self.record_error(&err);
                return Err(err);
            }
            self.inner.store_stale.store(false, Ordering::SeqCst);
            queue.len()
        };

        {
            let mut status = self.lock_status();
            status.last_sync_at = Some(finished_at);
            status.last_error =
                (failed > 0).then(|| format!("{failed} queued operation(s) failed to sync"));
        }

        let report = DrainReport {
            attempted: snapshot.len(),
            applied: applied.len(),
            failed,
            remaining,
            skipped: false,
        };
        info!(applied = report.applied, failed, remaining, "drain finished");
        self.emit(SyncEvent::DrainCompleted {
            applied: report.applied,
            failed,
            remaining,
        });
        Ok(report)
    }

    /// Caches `data` under `key` for offline reads.
    pub async fn save_offline_data(&self, key: &str, data: Value) -> SyncResult<()> {
        let store = self.inner.store.clone();
        let key = key.to_string();
        blocking(move || store.save_offline_data(&key, &data)).await
    }

    pub async fn load_offline_data(&self, key: &str) -> SyncResult<Option<Value>> {
        let store = self.inner.store.clone();
        let key = key.to_string();
        blocking(move || store.load_offline_data(&key)).await
    }

    pub fn status(&self) -> SyncStatus {
        let status = self.lock_status();
        SyncStatus {
            is_online: self.is_online(),
            is_syncing: self.is_syncing(),
            pending: self.pending_count(),
            last_sync_at: status.last_sync_at,
            last_error: status.last_error.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Copy of the in-memory queue, front first.
    pub async fn pending_operations(&self) -> Vec<PendingOperation> {
        self.inner.queue.lock().await.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    /// The remote store this engine writes through.
    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.inner.remote)
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.inner.events.send(event);
    }

    async fn persist_queue(&self, queue: Vec<PendingOperation>) -> SyncResult<()> {
        let store = self.inner.store.clone();
        blocking(move || store.replace_queue(&queue)).await?;
        self.inner.store_stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn record_error(&self, err: &SyncError) {
        self.lock_status().last_error = Some(err.to_string());
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, StatusState> {
        self.inner.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sends one operation to the remote store.
async fn apply_operation(
    remote: &dyn RemoteStore,
    op: &PendingOperation,
) -> SyncResult<OperationOutcome> {
    match op.kind {
        OperationKind::Insert => {
            let rows = remote.insert(&op.table, vec![op.payload.clone()]).await?;
            Ok(OperationOutcome::Applied(rows.into_iter().next().unwrap_or_default()))
        }
        OperationKind::Update => {
            let query = Query::by_id(target_of(op)?);
            let rows = remote.update(&op.table, &query, op.payload.clone()).await?;
            Ok(OperationOutcome::Applied(rows.into_iter().next().unwrap_or_default()))
        }
        OperationKind::Delete => {
            let query = Query::by_id(target_of(op)?);
            remote.delete(&op.table, &query).await?;
            Ok(OperationOutcome::Deleted)
        }
    }
}

fn target_of(op: &PendingOperation) -> Result<&str, ValidationError> {
    op.target_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingTargetId(op.kind))
}

fn offline_outcome(op: &PendingOperation) -> OperationOutcome {
    match op.kind {
        OperationKind::Insert => {
            let mut row = op.payload.clone();
            row.insert("id".into(), Value::String(format!("{TEMP_ID_PREFIX}{}", op.id)));
            row.insert(OFFLINE_MARKER.into(), Value::Bool(true));
            OperationOutcome::Provisional(row)
        }
        OperationKind::Update | OperationKind::Delete => OperationOutcome::AcceptedOffline,
    }
}

/// Runs a blocking store call off the async threads.
async fn blocking<T, F>(f: F) -> SyncResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SyncError::TaskFailed(e.to_string()))?
        .map_err(SyncError::from)
}

/// Holds the single-flight drain flag; clears it on drop.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
