//! Typed payloads written to the remote store.
//!
//! Each record serializes to the column layout of its table. Timestamps are
//! taken from the moment of capture rather than left to server defaults, since
//! a queued record may be replayed long after it was produced.

use crate::delivery::{DeliveryStatus, PhotoKind};
use crate::sample::GeoSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `location_tracking`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationTrackingRecord {
    pub courier_id: String,
    pub delivery_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

impl LocationTrackingRecord {
    pub fn from_sample(courier_id: &str, delivery_id: Option<&str>, sample: &GeoSample) -> Self {
        Self {
            courier_id: courier_id.to_string(),
            delivery_id: delivery_id.map(str::to_string),
            lat: sample.latitude(),
            lng: sample.longitude(),
            accuracy: sample.accuracy,
            speed: sample.speed,
            heading: sample.heading,
            battery_level: None,
            timestamp: sample.captured_at,
        }
    }
}

/// Patch applied to `courier_profiles` with the latest known position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourierLocationPatch {
    pub last_location_lat: f64,
    pub last_location_lng: f64,
    pub last_location_timestamp: DateTime<Utc>,
}

impl From<&GeoSample> for CourierLocationPatch {
    fn from(sample: &GeoSample) -> Self {
        Self {
            last_location_lat: sample.latitude(),
            last_location_lng: sample.longitude(),
            last_location_timestamp: sample.captured_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceEventType {
    Enter,
    Exit,
}

/// One row of `geofence_events`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEventRecord {
    pub courier_id: String,
    pub delivery_id: String,
    pub geofence_id: String,
    pub event_type: GeofenceEventType,
    pub lat: f64,
    pub lng: f64,
}

/// One row of `notifications`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub related_delivery_id: Option<String>,
}

impl NotificationRecord {
    pub fn geofence(user_id: &str, delivery_id: &str, event_type: GeofenceEventType) -> Self {
        let (title, verb) = match event_type {
            GeofenceEventType::Enter => ("Geofence Entered", "entered"),
            GeofenceEventType::Exit => ("Geofence Exited", "exited"),
        };
        Self {
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: format!("You have {verb} a geofence zone."),
            kind: "geofence".to_string(),
            related_delivery_id: Some(delivery_id.to_string()),
        }
    }
}

/// One row of `delivery_photos`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPhotoRecord {
    pub delivery_id: String,
    pub photo_url: String,
    pub photo_type: PhotoKind,
    pub taken_by: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub notes: String,
    pub taken_at: DateTime<Utc>,
}

/// One row of `delivery_status_updates`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStatusUpdateRecord {
    pub delivery_id: String,
    pub status: DeliveryStatus,
    pub updated_by: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}
