//! Geofence / location engine.
//!
//! Each position sample is evaluated synchronously against the active
//! delivery and any alerts are published at once. Recording (geofence
//! events, notifications, the location track and the courier's last known
//! position) is spawned per sample through the offline sync engine, so a
//! slow write never holds up the next sample. Recording failures are logged
//! and otherwise ignored.

use crate::config::TrackingConfig;
use crate::error::{SensorError, TrackingResult};
use crate::position::PositionSource;
use crate::proximity::{GeofenceAlert, evaluate_proximity_within};
use courier_sync::{Direction, OfflineSyncEngine, Query, RemoteStore};
use courier_types::records::{
    CourierLocationPatch, GeofenceEventRecord, GeofenceEventType, LocationTrackingRecord,
    NotificationRecord,
};
use courier_types::rows::{ACTIVE_DELIVERY_COLUMNS, decode_active_delivery, to_row};
use courier_types::{ActiveDelivery, DeliveryStatus, GeoSample, OperationKind, Row, tables};
use futures::StreamExt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// A new position was received.
    Position(GeoSample),
    /// The courier is inside a watched waypoint's radius.
    Alert(GeofenceAlert),
    /// The position source reported a failure. Tracking continues.
    SensorFailed(SensorError),
}

#[derive(Default)]
struct TrackingState {
    delivery: Option<ActiveDelivery>,
    last_position: Option<GeoSample>,
    last_error: Option<SensorError>,
}

struct EngineInner {
    courier_id: String,
    sync: OfflineSyncEngine,
    config: TrackingConfig,
    state: RwLock<TrackingState>,
    events: broadcast::Sender<TrackingEvent>,
}

/// Evaluates position samples for one courier. Clones share state.
#[derive(Clone)]
pub struct GeofenceEngine {
    inner: Arc<EngineInner>,
}

impl GeofenceEngine {
    pub fn new(
        courier_id: impl Into<String>,
        sync: OfflineSyncEngine,
        config: TrackingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            inner: Arc::new(EngineInner {
                courier_id: courier_id.into(),
                sync,
                config,
                state: RwLock::new(TrackingState::default()),
                events,
            }),
        }
    }

    pub fn courier_id(&self) -> &str {
        &self.inner.courier_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.inner.events.subscribe()
    }

    pub fn active_delivery(&self) -> Option<ActiveDelivery> {
        self.read_state(|s| s.delivery.clone())
    }

    pub fn set_active_delivery(&self, delivery: Option<ActiveDelivery>) {
        debug!(delivery = ?delivery.as_ref().map(|d| &d.id), "active delivery set");
        self.write_state(|s| s.delivery = delivery);
    }

    /// Reloads the active delivery from the remote store.
    ///
    /// With `delivery_id`, that delivery; otherwise the courier's newest
    /// assigned or in-transit one.
    pub async fn refresh_active_delivery(
        &self,
        delivery_id: Option<&str>,
    ) -> TrackingResult<Option<ActiveDelivery>> {
        let remote = self.inner.sync.remote();
        let delivery =
            load_active_delivery(remote.as_ref(), &self.inner.courier_id, delivery_id).await?;
        self.set_active_delivery(delivery.clone());
        Ok(delivery)
    }

    pub fn last_position(&self) -> Option<GeoSample> {
        self.read_state(|s| s.last_position.clone())
    }

    /// The most recent sensor failure, cleared by the next good sample.
    pub fn last_error(&self) -> Option<SensorError> {
        self.read_state(|s| s.last_error.clone())
    }

    /// Alerts for `sample` against the current delivery, without side effects.
    pub fn evaluate(&self, sample: &GeoSample) -> Vec<GeofenceAlert> {
        self.read_state(|s| {
            s.delivery
                .as_ref()
                .map(|d| evaluate_proximity_within(sample, d, self.inner.config.geofence_radius_km))
                .unwrap_or_default()
        })
    }

    /// Handles one tracked sample: evaluates, publishes, then records the
    /// alerts and the location in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle_sample(&self, sample: GeoSample) -> Vec<GeofenceAlert> {
        self.process(sample, true).0
    }

    /// Same as [`handle_sample`](Self::handle_sample), returning the recording
    /// task so callers can wait for it.
    pub fn handle_sample_tracked(&self, sample: GeoSample) -> (Vec<GeofenceAlert>, JoinHandle<()>) {
        self.process(sample, true)
    }

    /// Records a sensor failure and publishes it.
    pub fn handle_sensor_error(&self, error: SensorError) {
        warn!(courier = %self.inner.courier_id, "location error: {error}");
        self.write_state(|s| s.last_error = Some(error.clone()));
        let _ = self.inner.events.send(TrackingEvent::SensorFailed(error));
    }

    fn process(&self, sample: GeoSample, track: bool) -> (Vec<GeofenceAlert>, JoinHandle<()>) {
        let radius_km = self.inner.config.geofence_radius_km;
        let (alerts, delivery_id) = self.read_state(|s| match &s.delivery {
            Some(d) => (evaluate_proximity_within(&sample, d, radius_km), Some(d.id.clone())),
            None => (Vec::new(), None),
        });

        self.write_state(|s| {
            s.last_position = Some(sample.clone());
            s.last_error = None;
        });
        let _ = self.inner.events.send(TrackingEvent::Position(sample.clone()));
        for alert in &alerts {
            info!(alert = %alert.id, distance_km = alert.distance_km, "geofence alert");
            let _ = self.inner.events.send(TrackingEvent::Alert(alert.clone()));
        }

        let engine = self.clone();
        let to_record = alerts.clone();
        let task = tokio::spawn(async move {
            engine.record(&sample, delivery_id.as_deref(), &to_record, track).await;
        });
        (alerts, task)
    }

    async fn record(
        &self,
        sample: &GeoSample,
        delivery_id: Option<&str>,
        alerts: &[GeofenceAlert],
        track: bool,
    ) {
        let courier_id = self.inner.courier_id.as_str();

        for alert in alerts {
            let event = GeofenceEventRecord {
                courier_id: courier_id.to_string(),
                delivery_id: alert.delivery_id.clone(),
                geofence_id: alert.waypoint_id.clone(),
                event_type: GeofenceEventType::Enter,
                lat: sample.latitude(),
                lng: sample.longitude(),
            };
            self.submit_insert(tables::GEOFENCE_EVENTS, to_row(&event)).await;

            let note = NotificationRecord::geofence(
                courier_id,
                &alert.delivery_id,
                GeofenceEventType::Enter,
            );
            self.submit_insert(tables::NOTIFICATIONS, to_row(&note)).await;
        }

        if !track {
            return;
        }

        let location = LocationTrackingRecord::from_sample(courier_id, delivery_id, sample);
        self.submit_insert(tables::LOCATION_TRACKING, to_row(&location)).await;

        match to_row(&CourierLocationPatch::from(sample)) {
            Ok(patch) => {
                if let Err(e) = self
                    .inner
                    .sync
                    .perform_operation(
                        tables::COURIER_PROFILES,
                        OperationKind::Update,
                        patch,
                        Some(courier_id.to_string()),
                    )
                    .await
                {
                    warn!(courier = courier_id, "failed to update last location: {e}");
                }
            }
            Err(e) => warn!("failed to encode last location: {e}"),
        }
    }

    async fn submit_insert(&self, table: &str, row: Result<Row, courier_types::DecodeError>) {
        let result = match row {
            Ok(row) => self
                .inner
                .sync
                .perform_operation(table, OperationKind::Insert, row, None)
                .await
                .map(|_| ()),
            Err(e) => {
                warn!(table, "failed to encode record: {e}");
                return;
            }
        };
        if let Err(e) = result {
            warn!(table, "failed to record: {e}");
        }
    }

    /// Starts tracking from `source`.
    ///
    /// An initial one-shot fix is evaluated (alerts are published and
    /// recorded) but not added to the location track. The watch stream then
    /// drives [`handle_sample`](Self::handle_sample) until the subscription
    /// is stopped or dropped, or the stream ends.
    pub fn start(&self, source: Arc<dyn PositionSource>) -> TrackingSubscription {
        let engine = self.clone();
        let options = self.inner.config.position.clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let run = async {
                let mut stream = source.watch_position(&options);

                match source.current_position(&options).await {
                    Ok(sample) => {
                        engine.process(sample, false);
                    }
                    Err(e) => engine.handle_sensor_error(e),
                }

                while let Some(reading) = stream.next().await {
                    match reading {
                        Ok(sample) => {
                            engine.process(sample, true);
                        }
                        Err(e) => engine.handle_sensor_error(e),
                    }
                }
                info!("position stream ended");
            };

            tokio::select! {
                _ = stop_rx => debug!("tracking stopped"),
                _ = run => {}
            }
        });

        info!(courier = %self.inner.courier_id, "tracking started");
        TrackingSubscription {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    fn read_state<T>(&self, f: impl FnOnce(&TrackingState) -> T) -> T {
        f(&self.inner.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self, f: impl FnOnce(&mut TrackingState)) {
        f(&mut self.inner.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A running tracking loop. Dropping it aborts the loop.
pub struct TrackingSubscription {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TrackingSubscription {
    /// Ends tracking and waits for the loop to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TrackingSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Loads the delivery to watch.
///
/// With `delivery_id`, that delivery regardless of status. Without it, the
/// newest delivery assigned to `courier_id` that is `assigned` or
/// `in_transit`. `Ok(None)` when nothing matches.
pub async fn load_active_delivery(
    remote: &dyn RemoteStore,
    courier_id: &str,
    delivery_id: Option<&str>,
) -> TrackingResult<Option<ActiveDelivery>> {
    let query = match delivery_id {
        Some(id) => Query::by_id(id).columns(ACTIVE_DELIVERY_COLUMNS),
        None => Query::new()
            .columns(ACTIVE_DELIVERY_COLUMNS)
            .eq("assigned_courier", courier_id)
            .is_in(
                "status",
                [DeliveryStatus::Assigned.as_str(), DeliveryStatus::InTransit.as_str()],
            )
            .order_by("created_at", Direction::Desc)
            .limit(1),
    };

    let rows = remote.select(tables::DELIVERIES, &query).await?;
    match rows.into_iter().next() {
        Some(row) => Ok(Some(decode_active_delivery(row)?)),
        None => Ok(None),
    }
}
