use courier_types::records::{GeofenceEventType, LocationTrackingRecord, NotificationRecord};
use courier_types::rows::{decode_active_delivery, to_row};
use courier_types::{
    ActiveDelivery, DecodeError, DeliveryStatus, GeoSample, PhotoKind, Row, WaypointKind,
};
use serde_json::json;

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn nested_delivery(status: &str) -> Row {
    row(json!({
        "id": "del-1",
        "status": status,
        "pickup_location": {
            "id": "loc-p",
            "address": "1 Pickup St",
            "lat": 40.7128,
            "lng": -74.0060
        },
        "dropoff_location": { "id": 77, "address": null, "lat": "40.7306", "lng": "-73.9352" }
    }))
}

#[test]
fn decodes_nested_delivery() {
    let delivery = decode_active_delivery(nested_delivery("assigned")).unwrap();
    assert_eq!(delivery.id, "del-1");
    assert_eq!(delivery.status, DeliveryStatus::Assigned);

    let pickup = delivery.pickup.as_ref().unwrap();
    assert_eq!(pickup.id, "loc-p");
    assert_eq!(pickup.address.as_deref(), Some("1 Pickup St"));
    assert_eq!(pickup.coordinate.latitude, 40.7128);

    let dropoff = delivery.dropoff.as_ref().unwrap();
    assert_eq!(dropoff.id, "77");
    assert_eq!(dropoff.coordinate.longitude, -73.9352);
}

#[test]
fn missing_coordinates_drop_the_waypoint() {
    let raw = row(json!({
        "id": "del-2",
        "status": "in_transit",
        "pickup_location": { "id": "p", "lat": null, "lng": -74.0 },
        "dropoff_location": null
    }));
    let delivery = decode_active_delivery(raw).unwrap();
    assert!(delivery.pickup.is_none());
    assert!(delivery.dropoff.is_none());
}

#[test]
fn unknown_status_is_a_decode_error() {
    let err = decode_active_delivery(nested_delivery("lost_in_space")).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownStatus(s) if s == "lost_in_space"));
}

#[test]
fn gating_follows_status() {
    let assigned: ActiveDelivery = decode_active_delivery(nested_delivery("assigned")).unwrap();
    assert!(assigned.gated_waypoint(WaypointKind::Pickup).is_some());
    assert!(assigned.gated_waypoint(WaypointKind::Dropoff).is_none());

    let moving = decode_active_delivery(nested_delivery("in_transit")).unwrap();
    assert!(moving.gated_waypoint(WaypointKind::Pickup).is_none());
    assert!(moving.gated_waypoint(WaypointKind::Dropoff).is_some());
}

#[test]
fn status_roundtrips_through_strings() {
    for status in [
        DeliveryStatus::Pending,
        DeliveryStatus::Assigned,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
        DeliveryStatus::Cancelled,
    ] {
        assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
    }
}

#[test]
fn photo_transitions() {
    assert_eq!(
        PhotoKind::Pickup.status_transition(),
        Some((DeliveryStatus::InTransit, "actual_pickup"))
    );
    assert_eq!(
        PhotoKind::Dropoff.status_transition(),
        Some((DeliveryStatus::Delivered, "actual_dropoff"))
    );
    assert_eq!(PhotoKind::Damage.status_transition(), None);
}

#[test]
fn location_record_serializes_to_columns() {
    let sample = GeoSample::at(40.0, -74.0).with_accuracy(5.0).with_motion(3.2, 90.0);
    let record = LocationTrackingRecord::from_sample("courier-9", Some("del-1"), &sample);
    let row = to_row(&record).unwrap();

    assert_eq!(row["courier_id"], json!("courier-9"));
    assert_eq!(row["delivery_id"], json!("del-1"));
    assert_eq!(row["lat"], json!(40.0));
    assert_eq!(row["speed"], json!(3.2));
    assert!(!row.contains_key("battery_level"));
    assert!(row.contains_key("timestamp"));
}

#[test]
fn notification_uses_type_column() {
    let note = NotificationRecord::geofence("u-1", "del-1", GeofenceEventType::Enter);
    let row = to_row(&note).unwrap();
    assert_eq!(row["type"], json!("geofence"));
    assert_eq!(row["title"], json!("Geofence Entered"));
    assert_eq!(row["message"], json!("You have entered a geofence zone."));
}

#[test]
fn non_object_values_cannot_become_rows() {
    assert!(matches!(to_row(&42), Err(DecodeError::NotAnObject(_))));
}
