//! Daily route metrics.

use chrono::{DateTime, Utc};
use courier_types::{Coordinate, DeliveryStatus, GeoSample, path_length_km};
use serde::{Deserialize, Serialize};

/// One point of the day's location track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl From<&GeoSample> for TrackPoint {
    fn from(sample: &GeoSample) -> Self {
        Self {
            coordinate: sample.coordinate,
            timestamp: sample.captured_at,
        }
    }
}

/// The fields of a delivery that feed the metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub id: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub actual_pickup: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_dropoff: Option<DateTime<Utc>>,
    /// Planned distance in kilometres.
    #[serde(default, rename = "distance")]
    pub distance_km: Option<f64>,
}

impl DeliverySummary {
    /// Pickup to dropoff, in minutes, for a delivered delivery with both
    /// timestamps.
    pub fn duration_minutes(&self) -> Option<f64> {
        if self.status != DeliveryStatus::Delivered {
            return None;
        }
        let (pickup, dropoff) = (self.actual_pickup?, self.actual_dropoff?);
        Some((dropoff - pickup).num_milliseconds() as f64 / 60_000.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRouteMetrics {
    pub total_deliveries: usize,
    pub delivered: usize,
    pub failed: usize,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
    pub average_delivery_minutes: f64,
    pub location_points: usize,
}

/// Metrics for one courier's day.
///
/// Distance is the length of `track`, taken in timestamp order, when it has at
/// least two points, otherwise the sum of the deliveries' planned distances
/// with missing ones counted as zero. Timing only counts delivered deliveries that
/// have both a pickup and a dropoff timestamp.
pub fn summarize_day(deliveries: &[DeliverySummary], track: &[TrackPoint]) -> DailyRouteMetrics {
    let count = |status: DeliveryStatus| deliveries.iter().filter(|d| d.status == status).count();

    let total_distance_km = if track.len() > 1 {
        let mut ordered = track.to_vec();
        ordered.sort_by_key(|p| p.timestamp);
        let path: Vec<Coordinate> = ordered.iter().map(|p| p.coordinate).collect();
        path_length_km(&path)
    } else {
        deliveries.iter().filter_map(|d| d.distance_km).sum()
    };

    let durations: Vec<f64> = deliveries
        .iter()
        .filter_map(DeliverySummary::duration_minutes)
        .collect();
    let total_time_minutes: f64 = durations.iter().sum();
    let average_delivery_minutes = if durations.is_empty() {
        0.0
    } else {
        total_time_minutes / durations.len() as f64
    };

    DailyRouteMetrics {
        total_deliveries: deliveries.len(),
        delivered: count(DeliveryStatus::Delivered),
        failed: count(DeliveryStatus::Failed),
        total_distance_km,
        total_time_minutes,
        average_delivery_minutes,
        location_points: track.len(),
    }
}
