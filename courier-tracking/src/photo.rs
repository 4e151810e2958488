//! Delivery photo capture.
//!
//! Uploading the image needs connectivity; the photo record, the delivery
//! status change and the status history row are mutations and go through the
//! offline sync engine, so they are queued when the remote store fails.

use crate::error::{TrackingError, TrackingResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use courier_sync::{OfflineSyncEngine, SyncError};
use courier_types::records::{DeliveryPhotoRecord, DeliveryStatusUpdateRecord};
use courier_types::rows::to_row;
use courier_types::{Coordinate, DeliveryStatus, OperationKind, PhotoKind, Row, tables};
use serde_json::json;
use tracing::{info, warn};

const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Outcome of a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub path: String,
    pub url: String,
    pub kind: PhotoKind,
    pub taken_at: DateTime<Utc>,
    /// Status the delivery moved to, for pickup and dropoff photos.
    pub new_status: Option<DeliveryStatus>,
    /// True if any row mutation was queued instead of applied.
    pub queued: bool,
}

pub struct PhotoCaptureService {
    sync: OfflineSyncEngine,
    courier_id: String,
    bucket: String,
}

impl PhotoCaptureService {
    pub fn new(
        sync: OfflineSyncEngine,
        courier_id: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            sync,
            courier_id: courier_id.into(),
            bucket: bucket.into(),
        }
    }

    /// Uploads a `data:<mime>;base64,<data>` photo for `delivery_id` and
    /// records it.
    ///
    /// A pickup photo moves the delivery to `in_transit`, a dropoff photo to
    /// `delivered`, each with a status history row.
    pub async fn capture_and_upload(
        &self,
        photo_data_url: &str,
        location: Option<Coordinate>,
        delivery_id: &str,
        kind: PhotoKind,
        notes: Option<&str>,
    ) -> TrackingResult<CapturedPhoto> {
        let bytes = decode_data_url(photo_data_url)?;
        if !self.sync.is_online() {
            return Err(SyncError::Offline.into());
        }

        let taken_at = Utc::now();
        let path = format!(
            "{}/{}/{}_{}.jpg",
            self.courier_id,
            delivery_id,
            kind.as_str(),
            taken_at.timestamp_millis()
        );

        let remote = self.sync.remote();
        remote.upload(&self.bucket, &path, bytes, PHOTO_CONTENT_TYPE).await?;
        let url = remote.public_url(&self.bucket, &path);
        info!(delivery = delivery_id, %kind, path = %path, "photo uploaded");

        let (lat, lng) = (location.map(|c| c.latitude), location.map(|c| c.longitude));
        let photo = DeliveryPhotoRecord {
            delivery_id: delivery_id.to_string(),
            photo_url: url.clone(),
            photo_type: kind,
            taken_by: self.courier_id.clone(),
            lat,
            lng,
            notes: notes.unwrap_or(kind.default_note()).to_string(),
            taken_at,
        };
        let mut queued = self
            .submit(tables::DELIVERY_PHOTOS, OperationKind::Insert, to_row(&photo)?, None)
            .await?;

        let mut new_status = None;
        if let Some((status, stamp_column)) = kind.status_transition() {
            let mut patch = Row::new();
            patch.insert("status".into(), json!(status));
            patch.insert(stamp_column.into(), json!(taken_at));
            queued |= self
                .submit(
                    tables::DELIVERIES,
                    OperationKind::Update,
                    patch,
                    Some(delivery_id.to_string()),
                )
                .await?;

            let history = DeliveryStatusUpdateRecord {
                delivery_id: delivery_id.to_string(),
                status,
                updated_by: self.courier_id.clone(),
                lat,
                lng,
                notes: status_note(kind).to_string(),
                timestamp: taken_at,
            };
            queued |= self
                .submit(
                    tables::DELIVERY_STATUS_UPDATES,
                    OperationKind::Insert,
                    to_row(&history)?,
                    None,
                )
                .await?;
            new_status = Some(status);
        }

        Ok(CapturedPhoto {
            path,
            url,
            kind,
            taken_at,
            new_status,
            queued,
        })
    }

    /// Runs one mutation. Returns whether it was queued rather than applied.
    /// Remote failures are already queued by the engine and are not errors here.
    async fn submit(
        &self,
        table: &str,
        kind: OperationKind,
        payload: Row,
        target_id: Option<String>,
    ) -> TrackingResult<bool> {
        match self.sync.perform_operation(table, kind, payload, target_id).await {
            Ok(outcome) => Ok(outcome.is_offline()),
            Err(e) if e.is_remote() => {
                warn!(table, "write failed, queued for replay: {e}");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn status_note(kind: PhotoKind) -> &'static str {
    match kind {
        PhotoKind::Pickup => "Picked up package",
        PhotoKind::Dropoff => "Delivered package",
        PhotoKind::Damage | PhotoKind::Other => "",
    }
}

/// Decodes the payload of a base64 data URL.
pub fn decode_data_url(data_url: &str) -> TrackingResult<Vec<u8>> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| TrackingError::InvalidPhoto("not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| TrackingError::InvalidPhoto("missing data separator".into()))?;
    if !header.ends_with(";base64") {
        return Err(TrackingError::InvalidPhoto("data URL is not base64 encoded".into()));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| TrackingError::InvalidPhoto(e.to_string()))?;
    if bytes.is_empty() {
        return Err(TrackingError::InvalidPhoto("empty image".into()));
    }
    Ok(bytes)
}

