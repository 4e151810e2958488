use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Lifecycle status of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "assigned" => Ok(DeliveryStatus::Assigned),
            "in_transit" => Ok(DeliveryStatus::InTransit),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            other => Err(DecodeError::UnknownStatus(other.to_string())),
        }
    }
}

/// Which end of a delivery a waypoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Pickup,
    Dropoff,
}

impl WaypointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaypointKind::Pickup => "pickup",
            WaypointKind::Dropoff => "dropoff",
        }
    }

    /// The delivery status under which this waypoint is watched.
    pub fn gating_status(&self) -> DeliveryStatus {
        match self {
            WaypointKind::Pickup => DeliveryStatus::Assigned,
            WaypointKind::Dropoff => DeliveryStatus::InTransit,
        }
    }
}

impl fmt::Display for WaypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pickup or dropoff location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub address: Option<String>,
    pub coordinate: Coordinate,
}

/// The delivery currently watched by the geofence engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDelivery {
    pub id: String,
    pub status: DeliveryStatus,
    pub pickup: Option<Waypoint>,
    pub dropoff: Option<Waypoint>,
}

impl ActiveDelivery {
    pub fn waypoint(&self, kind: WaypointKind) -> Option<&Waypoint> {
        match kind {
            WaypointKind::Pickup => self.pickup.as_ref(),
            WaypointKind::Dropoff => self.dropoff.as_ref(),
        }
    }

    /// Returns the waypoint only if the current status gates it in.
    pub fn gated_waypoint(&self, kind: WaypointKind) -> Option<&Waypoint> {
        if self.status == kind.gating_status() {
            self.waypoint(kind)
        } else {
            None
        }
    }
}

/// Purpose of a photo taken during a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoKind {
    Pickup,
    Dropoff,
    Damage,
    Other,
}

impl PhotoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Pickup => "pickup",
            PhotoKind::Dropoff => "dropoff",
            PhotoKind::Damage => "damage",
            PhotoKind::Other => "other",
        }
    }

    /// Status a delivery moves to once this photo is recorded, together with
    /// the timestamp column stamped on the delivery row.
    pub fn status_transition(&self) -> Option<(DeliveryStatus, &'static str)> {
        match self {
            PhotoKind::Pickup => Some((DeliveryStatus::InTransit, "actual_pickup")),
            PhotoKind::Dropoff => Some((DeliveryStatus::Delivered, "actual_dropoff")),
            PhotoKind::Damage | PhotoKind::Other => None,
        }
    }

    pub fn default_note(&self) -> &'static str {
        match self {
            PhotoKind::Pickup => "Pickup photo",
            PhotoKind::Dropoff => "Dropoff photo",
            PhotoKind::Damage | PhotoKind::Other => "Other photo",
        }
    }
}

impl fmt::Display for PhotoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
