//! Stateless geofence evaluation.
//!
//! A waypoint is watched only while the delivery is in the status that leads
//! to it: the pickup while `assigned`, the dropoff while `in_transit`. Every
//! sample inside the radius produces an alert; there is no enter/exit memory,
//! so consumers de-duplicate by alert id.

use courier_types::{ActiveDelivery, GeoSample, WaypointKind, haversine_km};
use serde::{Deserialize, Serialize};

/// Default alert radius (200 m).
pub const GEOFENCE_RADIUS_KM: f64 = 0.2;

/// The courier is within the radius of a watched waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceAlert {
    /// `"pickup-<delivery id>"` or `"dropoff-<delivery id>"`.
    pub id: String,
    pub kind: WaypointKind,
    pub delivery_id: String,
    pub waypoint_id: String,
    pub distance_km: f64,
}

/// Inclusive: a sample exactly on the boundary alerts.
pub fn within_radius(distance_km: f64, radius_km: f64) -> bool {
    distance_km <= radius_km
}

/// Alerts for `sample` against `delivery` with the default radius.
pub fn evaluate_proximity(sample: &GeoSample, delivery: &ActiveDelivery) -> Vec<GeofenceAlert> {
    evaluate_proximity_within(sample, delivery, GEOFENCE_RADIUS_KM)
}

pub fn evaluate_proximity_within(
    sample: &GeoSample,
    delivery: &ActiveDelivery,
    radius_km: f64,
) -> Vec<GeofenceAlert> {
    [WaypointKind::Pickup, WaypointKind::Dropoff]
        .into_iter()
        .filter_map(|kind| {
            let waypoint = delivery.gated_waypoint(kind)?;
            let distance_km = haversine_km(sample.coordinate, waypoint.coordinate);
            within_radius(distance_km, radius_km).then(|| GeofenceAlert {
                id: format!("{}-{}", kind.as_str(), delivery.id),
                kind,
                delivery_id: delivery.id.clone(),
                waypoint_id: waypoint.id.clone(),
                distance_km,
            })
        })
        .collect()
}
