//! Core domain types for the courier offline core.
//!
//! - `PendingOperation`: a buffered mutation awaiting replay
//! - `ActiveDelivery` and `Waypoint`, decoded from the nested delivery row shape
//! - `GeoSample` and the haversine distance used by geofencing and reports
//! - typed record payloads written to the remote store

mod delivery;
mod error;
pub mod geo;
mod operation;
pub mod records;
pub mod rows;
mod sample;

pub use delivery::{ActiveDelivery, DeliveryStatus, PhotoKind, Waypoint, WaypointKind};
pub use error::{DecodeError, ValidationError};
pub use geo::{Coordinate, EARTH_RADIUS_KM, haversine_km, path_length_km};
pub use operation::{OperationKind, PendingOperation};
pub use sample::GeoSample;

/// A loosely typed row as exchanged with the remote store.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Remote table names used by the core.
pub mod tables {
    pub const DELIVERIES: &str = "deliveries";
    pub const LOCATION_TRACKING: &str = "location_tracking";
    pub const COURIER_PROFILES: &str = "courier_profiles";
    pub const GEOFENCE_EVENTS: &str = "geofence_events";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const DELIVERY_PHOTOS: &str = "delivery_photos";
    pub const DELIVERY_STATUS_UPDATES: &str = "delivery_status_updates";
}
