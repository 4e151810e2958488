use crate::position::PositionOptions;
use crate::proximity::GEOFENCE_RADIUS_KM;
use serde::{Deserialize, Serialize};

/// Configuration for tracking and photo capture.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackingConfig {
    /// Alert radius around a watched waypoint, in kilometres.
    pub geofence_radius_km: f64,

    /// Bucket that receives delivery photos.
    pub photo_bucket: String,

    /// Options passed to the position source.
    pub position: PositionOptions,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            geofence_radius_km: GEOFENCE_RADIUS_KM,
            photo_bucket: "delivery_photos".to_string(),
            position: PositionOptions::default(),
        }
    }
}
