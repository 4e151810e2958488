//! Background worker that drains the queue when connectivity returns.

use crate::engine::{OfflineSyncEngine, SyncEvent};
use crate::error::{SyncError, SyncResult};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Commands accepted by the sync worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Run a drain pass now.
    Drain,
    /// Stop the worker loop.
    Stop,
}

/// Handle for sending commands to the worker.
#[derive(Clone)]
pub struct SyncWorkerHandle {
    command_tx: mpsc::Sender<WorkerCommand>,
}

impl SyncWorkerHandle {
    pub async fn drain(&self) -> SyncResult<()> {
        self.command_tx
            .send(WorkerCommand::Drain)
            .await
            .map_err(|_| SyncError::WorkerStopped)
    }

    pub async fn stop(&self) -> SyncResult<()> {
        self.command_tx
            .send(WorkerCommand::Stop)
            .await
            .map_err(|_| SyncError::WorkerStopped)
    }
}

/// Drains the engine's queue on every offline to online transition.
pub struct SyncWorker {
    engine: OfflineSyncEngine,
    command_rx: mpsc::Receiver<WorkerCommand>,
    connectivity_rx: watch::Receiver<bool>,
}

/// Creates a sync worker and its command handle.
///
/// Spawn `SyncWorker::run` on the runtime; the handle stays usable from
/// anywhere.
pub fn create_sync_worker(engine: OfflineSyncEngine) -> (SyncWorkerHandle, SyncWorker) {
    let (command_tx, command_rx) = mpsc::channel(16);
    let connectivity_rx = engine.connectivity().subscribe();

    let handle = SyncWorkerHandle { command_tx };
    let worker = SyncWorker {
        engine,
        command_rx,
        connectivity_rx,
    };
    (handle, worker)
}

impl SyncWorker {
    /// Runs the worker loop until stopped or until every handle is dropped.
    pub async fn run(mut self) {
        let mut was_online = *self.connectivity_rx.borrow_and_update();
        info!(online = was_online, pending = self.engine.pending_count(), "sync worker started");

        if was_online {
            self.drain("startup").await;
        }

        loop {
            tokio::select! {
                changed = self.connectivity_rx.changed() => {
                    if changed.is_err() {
                        info!("connectivity source closed, stopping sync worker");
                        break;
                    }
                    let online = *self.connectivity_rx.borrow_and_update();
                    if online == was_online {
                        continue;
                    }
                    was_online = online;
                    self.engine.emit(SyncEvent::ConnectivityChanged { online });
                    if online {
                        self.drain("connectivity restored").await;
                    }
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(WorkerCommand::Drain) => self.drain("requested").await,
                        Some(WorkerCommand::Stop) => {
                            info!("sync worker stopping");
                            break;
                        }
                        None => {
                            info!("command channel closed, stopping sync worker");
                            break;
                        }
                    }
                }
            }
        }

        info!("sync worker stopped");
    }

    async fn drain(&self, reason: &'static str) {
        if self.engine.pending_count() == 0 {
            debug!(reason, "nothing queued");
            return;
        }
        match self.engine.process_sync_queue().await {
            Ok(report) if report.skipped => debug!(reason, "drain skipped"),
            Ok(report) => debug!(
                reason,
                applied = report.applied,
                remaining = report.remaining,
                "drain done"
            ),
            Err(e) => error!(reason, "drain failed: {e}"),
        }
    }
}
