//! Scripted in-memory remote store for engine and worker tests.

#![allow(dead_code)]

use async_trait::async_trait;
use courier_storage::QueueStore;
use courier_sync::{
    ConnectivityMonitor, OfflineSyncEngine, Query, RemoteStore, SyncError, SyncResult,
};
use courier_types::Row;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// One call received by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select { table: String, query: Query },
    Insert { table: String, row: Row },
    Update { table: String, id: String, patch: Row },
    Delete { table: String, id: String },
    Upload { bucket: String, path: String, size: usize, content_type: String },
}

/// Records calls and fails the ones whose marker is in the failing set.
///
/// The marker of an insert is its payload's `"key"` field; of an update or
/// delete, its target id.
#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
    fail_all: Mutex<bool>,
    select_rows: Mutex<Vec<Row>>,
    next_id: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

/// Blocks mutating calls until released.
#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub permits: Arc<Semaphore>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_marker(&self, marker: &str) {
        self.failing.lock().unwrap().insert(marker.to_string());
    }

    pub fn heal_marker(&self, marker: &str) {
        self.failing.lock().unwrap().remove(marker);
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }

    pub fn set_select_rows(&self, rows: Vec<Row>) {
        *self.select_rows.lock().unwrap() = rows;
    }

    /// Installs a gate; every mutating call waits for one permit.
    pub fn install_gate(&self) -> Gate {
        let gate = Gate {
            entered: Arc::new(Notify::new()),
            permits: Arc::new(Semaphore::new(0)),
        };
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn insert_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Insert { row, .. } => {
                    row.get("key").and_then(Value::as_str).map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Select { .. }))
            .count()
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            if let Ok(permit) = gate.permits.acquire().await {
                permit.forget();
            }
        }
    }

    fn check(&self, marker: Option<&str>) -> SyncResult<()> {
        let fail_all = *self.fail_all.lock().unwrap();
        let marked = marker.is_some_and(|m| self.failing.lock().unwrap().contains(m));
        if fail_all || marked {
            return Err(SyncError::Remote {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

fn id_of(query: &Query) -> String {
    query
        .to_params()
        .into_iter()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.trim_start_matches("eq.").to_string())
        .unwrap_or_default()
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn select(&self, table: &str, query: &Query) -> SyncResult<Vec<Row>> {
        self.calls.lock().unwrap().push(Call::Select {
            table: table.into(),
            query: query.clone(),
        });
        self.check(None)?;
        Ok(self.select_rows.lock().unwrap().clone())
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> SyncResult<Vec<Row>> {
        self.pass_gate().await;
        let mut echoed = Vec::with_capacity(rows.len());
        for row in rows {
            self.calls.lock().unwrap().push(Call::Insert {
                table: table.into(),
                row: row.clone(),
            });
            self.check(row.get("key").and_then(Value::as_str))?;
            let mut stored = row;
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            stored.insert("id".into(), json!(format!("srv-{n}")));
            echoed.push(stored);
        }
        Ok(echoed)
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> SyncResult<Vec<Row>> {
        self.pass_gate().await;
        let id = id_of(query);
        self.calls.lock().unwrap().push(Call::Update {
            table: table.into(),
            id: id.clone(),
            patch: patch.clone(),
        });
        self.check(Some(&id))?;
        let mut row = patch;
        row.insert("id".into(), json!(id));
        Ok(vec![row])
    }

    async fn delete(&self, table: &str, query: &Query) -> SyncResult<()> {
        self.pass_gate().await;
        let id = id_of(query);
        self.calls.lock().unwrap().push(Call::Delete {
            table: table.into(),
            id: id.clone(),
        });
        self.check(Some(&id))
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
            size: bytes.len(),
            content_type: content_type.into(),
        });
        self.check(Some(path))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://files.test/{bucket}/{path}")
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

pub fn keyed(key: &str) -> Row {
    row(json!({ "key": key }))
}

pub async fn engine_with(
    remote: Arc<FakeRemote>,
    store: QueueStore,
    online: bool,
) -> OfflineSyncEngine {
    OfflineSyncEngine::open(remote, store, ConnectivityMonitor::new(online))
        .await
        .unwrap()
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
