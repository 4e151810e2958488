//! Offline sync engine for the courier client.
//!
//! Mutations made while the device is offline (or while the remote store is
//! failing) are kept in a durable FIFO queue and replayed once connectivity
//! returns:
//! - `engine`: online-first writes with enqueue fallback, single-flight drain
//! - `worker`: select loop that drains on every offline to online transition
//! - `remote` / `api_client`: the remote row store and its REST client
//! - `connectivity`: host-driven online/offline state

pub mod api_client;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod remote;
pub mod telemetry;
pub mod worker;

pub use api_client::RestStoreClient;
pub use config::RemoteConfig;
pub use connectivity::ConnectivityMonitor;
pub use engine::{DrainReport, OfflineSyncEngine, OperationOutcome, SyncEvent, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use remote::{Direction, Filter, Query, RemoteStore};
pub use worker::{SyncWorker, SyncWorkerHandle, WorkerCommand, create_sync_worker};
