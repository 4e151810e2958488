use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reading from the device position source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub coordinate: Coordinate,
    /// Accuracy radius in metres.
    pub accuracy: f64,
    /// Ground speed in m/s, when the source reports one.
    pub speed: Option<f64>,
    /// Heading in degrees clockwise from true north.
    pub heading: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl GeoSample {
    /// A sample at the given point, captured now, with no motion data.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
            accuracy: 0.0,
            speed: None,
            heading: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_motion(mut self, speed: f64, heading: f64) -> Self {
        self.speed = Some(speed);
        self.heading = Some(heading);
        self
    }

    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }
}
