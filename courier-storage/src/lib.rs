//! SQLite storage layer for the courier offline core.
//!
//! Two collections survive a restart:
//!
//! - `sync_queue`: pending mutations, stored whole as JSON in enqueue order
//! - `offline_data`: named datasets cached for offline reads
//!
//! A small `sync_meta` table holds bookkeeping such as the last successful
//! drain time. Schema creation is idempotent and runs on every open.

mod error;
mod queue_store;

pub use error::{StorageError, StorageResult};
pub use queue_store::QueueStore;
