//! Row shapes returned by the remote store, decoded at the boundary.
//!
//! The remote API expresses joins as nested objects and is loose about
//! numeric encoding (ids and decimals may arrive as strings or numbers).
//! These DTOs absorb that looseness so the rest of the core only sees
//! `ActiveDelivery` and `Waypoint`.

use crate::Row;
use crate::delivery::{ActiveDelivery, DeliveryStatus, Waypoint};
use crate::error::DecodeError;
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};

/// Column selection for the nested delivery shape used by geofencing.
pub const ACTIVE_DELIVERY_COLUMNS: &str = "id,status,\
pickup_location:pickup_location(id,address,lat,lng),\
dropoff_location:dropoff_location(id,address,lat,lng)";

/// A `locations` row embedded in a delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationRow {
    #[serde(deserialize_with = "deserialize_string_or_num")]
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_f64_from_str_or_num")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_f64_from_str_or_num")]
    pub lng: Option<f64>,
}

impl LocationRow {
    /// A waypoint, or `None` when either coordinate is missing.
    pub fn into_waypoint(self) -> Option<Waypoint> {
        let (lat, lng) = (self.lat?, self.lng?);
        Some(Waypoint {
            id: self.id,
            address: self.address,
            coordinate: Coordinate::new(lat, lng),
        })
    }
}

/// A `deliveries` row selected with `ACTIVE_DELIVERY_COLUMNS`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryRow {
    #[serde(deserialize_with = "deserialize_string_or_num")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub pickup_location: Option<LocationRow>,
    #[serde(default)]
    pub dropoff_location: Option<LocationRow>,
}

impl TryFrom<DeliveryRow> for ActiveDelivery {
    type Error = DecodeError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        Ok(ActiveDelivery {
            id: row.id,
            status: row.status.parse::<DeliveryStatus>()?,
            pickup: row.pickup_location.and_then(LocationRow::into_waypoint),
            dropoff: row.dropoff_location.and_then(LocationRow::into_waypoint),
        })
    }
}

/// Decodes a raw remote row into an `ActiveDelivery`.
pub fn decode_active_delivery(row: Row) -> Result<ActiveDelivery, DecodeError> {
    let dto: DeliveryRow = serde_json::from_value(serde_json::Value::Object(row))?;
    dto.try_into()
}

/// Serializes a typed record into a row object.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, DecodeError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject(std::any::type_name::<T>())),
    }
}

fn deserialize_string_or_num<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct IdVisitor;
    impl de::Visitor<'_> for IdVisitor {
        type Value = String;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a string or integer id")
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }
    deserializer.deserialize_any(IdVisitor)
}

/// Accepts a JSON number, a string-encoded number (e.g. `"40.7128"` from a
/// numeric column), or null.
fn deserialize_opt_f64_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct OptF64Visitor;
    impl<'de> de::Visitor<'de> for OptF64Visitor {
        type Value = Option<f64>;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a number, a string-encoded number, or null")
        }
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map(Some).map_err(de::Error::custom)
        }
        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
        fn visit_some<D: serde::Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }
    deserializer.deserialize_any(OptF64Visitor)
}
