//! In-memory remote store and engine builders for tracking tests.

#![allow(dead_code)]

use async_trait::async_trait;
use courier_storage::QueueStore;
use courier_sync::{
    ConnectivityMonitor, OfflineSyncEngine, Query, RemoteStore, SyncError, SyncResult,
};
use courier_types::Row;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select { table: String, params: Vec<(String, String)> },
    Insert { table: String, row: Row },
    Update { table: String, id: String, patch: Row },
    Upload { bucket: String, path: String, bytes: Vec<u8>, content_type: String },
}

/// Records every call. Tables listed in `failing` reject mutations.
#[derive(Default)]
pub struct RecordingRemote {
    calls: Mutex<Vec<Call>>,
    select_rows: Mutex<Vec<Row>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_select_rows(&self, rows: Vec<Row>) {
        *self.select_rows.lock().unwrap() = rows;
    }

    pub fn fail_table(&self, table: &str) {
        self.failing.lock().unwrap().push(table.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Rows inserted into `table`, in call order.
    pub fn inserted(&self, table: &str) -> Vec<Row> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Insert { table: t, row } if t == table => Some(row),
                _ => None,
            })
            .collect()
    }

    /// `(id, patch)` of every update on `table`.
    pub fn updated(&self, table: &str) -> Vec<(String, Row)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update { table: t, id, patch } if t == table => Some((id, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .collect()
    }

    fn check(&self, table: &str) -> SyncResult<()> {
        if self.failing.lock().unwrap().iter().any(|t| t == table) {
            return Err(SyncError::Remote {
                status: 500,
                message: "write rejected".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn select(&self, table: &str, query: &Query) -> SyncResult<Vec<Row>> {
        self.calls.lock().unwrap().push(Call::Select {
            table: table.into(),
            params: query.to_params(),
        });
        Ok(self.select_rows.lock().unwrap().clone())
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> SyncResult<Vec<Row>> {
        for row in &rows {
            self.calls.lock().unwrap().push(Call::Insert {
                table: table.into(),
                row: row.clone(),
            });
        }
        self.check(table)?;
        Ok(rows)
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> SyncResult<Vec<Row>> {
        let id = query
            .to_params()
            .into_iter()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.trim_start_matches("eq.").to_string())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(Call::Update {
            table: table.into(),
            id,
            patch: patch.clone(),
        });
        self.check(table)?;
        Ok(vec![patch])
    }

    async fn delete(&self, _table: &str, _query: &Query) -> SyncResult<()> {
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<()> {
        self.calls.lock().unwrap().push(Call::Upload {
            bucket: bucket.into(),
            path: path.into(),
            bytes,
            content_type: content_type.into(),
        });
        self.check(bucket)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://files.test/{bucket}/{path}")
    }
}

pub async fn sync_engine(remote: Arc<RecordingRemote>, online: bool) -> OfflineSyncEngine {
    OfflineSyncEngine::open(
        remote,
        QueueStore::open_in_memory().unwrap(),
        ConnectivityMonitor::new(online),
    )
    .await
    .unwrap()
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

/// A delivery row in the nested shape returned by the remote store.
pub fn delivery_row(id: &str, status: &str, pickup: (f64, f64), dropoff: (f64, f64)) -> Row {
    row(json!({
        "id": id,
        "status": status,
        "pickup_location": {
            "id": format!("{id}-p"),
            "address": "1 Pickup St",
            "lat": pickup.0,
            "lng": pickup.1
        },
        "dropoff_location": {
            "id": format!("{id}-d"),
            "address": "2 Dropoff Ave",
            "lat": dropoff.0,
            "lng": dropoff.1
        },
    }))
}

/// Polls `cond` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
