use courier_tracking::proximity::{evaluate_proximity_within, within_radius};
use courier_tracking::{GEOFENCE_RADIUS_KM, evaluate_proximity};
use courier_types::{ActiveDelivery, Coordinate, DeliveryStatus, GeoSample, Waypoint, WaypointKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const PICKUP: Coordinate = Coordinate::new(40.7128, -74.0060);
const DROPOFF: Coordinate = Coordinate::new(40.7580, -73.9855);

fn delivery(status: DeliveryStatus) -> ActiveDelivery {
    ActiveDelivery {
        id: "del-1".into(),
        status,
        pickup: Some(Waypoint {
            id: "loc-p".into(),
            address: None,
            coordinate: PICKUP,
        }),
        dropoff: Some(Waypoint {
            id: "loc-d".into(),
            address: None,
            coordinate: DROPOFF,
        }),
    }
}

fn north_of(origin: Coordinate, degrees: f64) -> GeoSample {
    GeoSample::at(origin.latitude + degrees, origin.longitude)
}

#[test]
fn boundary_is_inclusive() {
    assert!(within_radius(0.2, 0.2));
    assert!(within_radius(0.1999, 0.2));
    assert!(!within_radius(0.2001, 0.2));
    assert!(!within_radius(0.201, 0.2));
}

#[test]
fn pickup_alert_while_assigned() {
    // ~185 m east of the pickup.
    let sample = GeoSample::at(40.7128, -74.0038);
    let alerts = evaluate_proximity(&sample, &delivery(DeliveryStatus::Assigned));

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.id, "pickup-del-1");
    assert_eq!(alert.kind, WaypointKind::Pickup);
    assert_eq!(alert.delivery_id, "del-1");
    assert_eq!(alert.waypoint_id, "loc-p");
    assert!(alert.distance_km < GEOFENCE_RADIUS_KM);
}

#[test]
fn pickup_is_ignored_once_in_transit() {
    let sample = GeoSample::at(40.7128, -74.0038);
    assert!(evaluate_proximity(&sample, &delivery(DeliveryStatus::InTransit)).is_empty());
}

#[test]
fn dropoff_alert_while_in_transit() {
    let alerts = evaluate_proximity(
        &north_of(DROPOFF, 0.0017),
        &delivery(DeliveryStatus::InTransit),
    );
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "dropoff-del-1");
    assert_eq!(alerts[0].waypoint_id, "loc-d");
}

#[test]
fn dropoff_is_ignored_while_assigned() {
    let alerts = evaluate_proximity(&north_of(DROPOFF, 0.0), &delivery(DeliveryStatus::Assigned));
    assert!(alerts.is_empty());
}

#[test]
fn just_outside_the_radius_does_not_alert() {
    // 0.0019 degrees of latitude is ~211 m.
    let sample = north_of(PICKUP, 0.0019);
    assert!(evaluate_proximity(&sample, &delivery(DeliveryStatus::Assigned)).is_empty());
}

#[test]
fn finished_deliveries_watch_nothing() {
    for status in [
        DeliveryStatus::Pending,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::Cancelled,
    ] {
        assert!(evaluate_proximity(&north_of(PICKUP, 0.0), &delivery(status)).is_empty());
        assert!(evaluate_proximity(&north_of(DROPOFF, 0.0), &delivery(status)).is_empty());
    }
}

#[test]
fn missing_waypoint_is_skipped() {
    let mut d = delivery(DeliveryStatus::Assigned);
    d.pickup = None;
    assert!(evaluate_proximity(&north_of(PICKUP, 0.0), &d).is_empty());
}

#[test]
fn custom_radius() {
    let sample = north_of(PICKUP, 0.0019);
    let d = delivery(DeliveryStatus::Assigned);
    assert!(evaluate_proximity_within(&sample, &d, 0.2).is_empty());
    assert_eq!(evaluate_proximity_within(&sample, &d, 0.5).len(), 1);
}

#[test]
fn repeated_samples_repeat_the_alert() {
    let d = delivery(DeliveryStatus::Assigned);
    let sample = north_of(PICKUP, 0.0005);
    let first = evaluate_proximity(&sample, &d);
    let second = evaluate_proximity(&sample, &d);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

proptest! {
    #[test]
    fn alert_iff_within_radius(offset in -0.01f64..0.01) {
        let d = delivery(DeliveryStatus::Assigned);
        let sample = north_of(PICKUP, offset);
        let distance = courier_types::haversine_km(sample.coordinate, PICKUP);
        let alerts = evaluate_proximity(&sample, &d);
        prop_assert_eq!(alerts.len() == 1, distance <= GEOFENCE_RADIUS_KM);
    }
}
