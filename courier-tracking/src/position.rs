//! Device position sources.
//!
//! A `PositionSource` hands out one-shot fixes and watch streams. Each
//! `watch_position` call is an independent subscription; dropping the stream
//! ends it.

use crate::error::SensorError;
use async_trait::async_trait;
use chrono::Utc;
use courier_types::GeoSample;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Sample stream produced by `watch_position`.
pub type PositionStream = BoxStream<'static, Result<GeoSample, SensorError>>;

/// Options for a fix request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Oldest cached fix accepted, in milliseconds. `0` demands a fresh one.
    pub maximum_age_ms: u64,
    /// Longest wait for a fix before reporting `SensorError::Timeout`.
    pub timeout_ms: u64,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age_ms: 0,
            timeout_ms: 15_000,
        }
    }
}

impl PositionOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn maximum_age(&self) -> Duration {
        Duration::from_millis(self.maximum_age_ms)
    }
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    /// A single fix.
    async fn current_position(&self, options: &PositionOptions) -> Result<GeoSample, SensorError>;

    /// A continuous stream of fixes and sensor errors.
    fn watch_position(&self, options: &PositionOptions) -> PositionStream;
}

type Reading = Result<GeoSample, SensorError>;

/// Position source fed by the host platform through a [`PositionFeed`].
pub struct ChannelPositionSource {
    template: Mutex<broadcast::Receiver<Reading>>,
    last_fix: Arc<Mutex<Option<GeoSample>>>,
}

/// Host side of a [`ChannelPositionSource`]. Dropping every feed closes the
/// source: open streams end and pending fixes fail with `SensorError::Closed`.
#[derive(Clone)]
pub struct PositionFeed {
    tx: broadcast::Sender<Reading>,
    last_fix: Arc<Mutex<Option<GeoSample>>>,
}

impl ChannelPositionSource {
    pub fn new() -> (Self, PositionFeed) {
        Self::with_capacity(64)
    }

    /// `capacity` bounds how far a slow watcher may fall behind before it
    /// skips readings.
    pub fn with_capacity(capacity: usize) -> (Self, PositionFeed) {
        let (tx, rx) = broadcast::channel(capacity);
        let last_fix = Arc::new(Mutex::new(None));
        let source = Self {
            template: Mutex::new(rx),
            last_fix: Arc::clone(&last_fix),
        };
        (source, PositionFeed { tx, last_fix })
    }

    fn receiver(&self) -> broadcast::Receiver<Reading> {
        self.template
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resubscribe()
    }

    fn cached_fix(&self, maximum_age: Duration) -> Option<GeoSample> {
        if maximum_age.is_zero() {
            return None;
        }
        let cached = self.last_fix.lock().unwrap_or_else(PoisonError::into_inner).clone()?;
        let age = (Utc::now() - cached.captured_at).to_std().unwrap_or_default();
        (age <= maximum_age).then_some(cached)
    }
}

#[async_trait]
impl PositionSource for ChannelPositionSource {
    async fn current_position(&self, options: &PositionOptions) -> Result<GeoSample, SensorError> {
        if let Some(fix) = self.cached_fix(options.maximum_age()) {
            return Ok(fix);
        }
        let mut rx = self.receiver();
        match tokio::time::timeout(options.timeout(), next_reading(&mut rx)).await {
            Ok(Some(reading)) => reading,
            Ok(None) => Err(SensorError::Closed),
            Err(_) => Err(SensorError::Timeout),
        }
    }

    fn watch_position(&self, options: &PositionOptions) -> PositionStream {
        let timeout = options.timeout();
        futures::stream::unfold(self.receiver(), move |mut rx| async move {
            match tokio::time::timeout(timeout, next_reading(&mut rx)).await {
                Ok(Some(reading)) => Some((reading, rx)),
                Ok(None) => None,
                Err(_) => Some((Err(SensorError::Timeout), rx)),
            }
        })
        .boxed()
    }
}

/// Next reading, skipping over any a lagging receiver missed. `None` once
/// the feed is gone.
async fn next_reading(rx: &mut broadcast::Receiver<Reading>) -> Option<Reading> {
    loop {
        match rx.recv().await {
            Ok(reading) => return Some(reading),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "position watcher lagged"),
            Err(RecvError::Closed) => return None,
        }
    }
}

impl PositionFeed {
    /// Publishes a fix to every open watcher and pending one-shot request.
    pub fn push(&self, sample: GeoSample) {
        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(sample.clone());
        let _ = self.tx.send(Ok(sample));
    }

    /// Publishes a sensor failure.
    pub fn fail(&self, error: SensorError) {
        let _ = self.tx.send(Err(error));
    }

    /// Number of live receivers, including the source's own template.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
