//! Location tracking for the courier client.
//!
//! - `position`: the device position source and its cancellable sample stream
//! - `proximity`: stateless geofence evaluation against the active delivery
//! - `engine`: the tracking loop that evaluates, alerts and records samples
//! - `photo`: delivery photo upload and the status transition it implies
//! - `route`: daily distance and timing metrics

pub mod config;
pub mod engine;
pub mod error;
pub mod photo;
pub mod position;
pub mod proximity;
pub mod route;

pub use config::TrackingConfig;
pub use engine::{GeofenceEngine, TrackingEvent, TrackingSubscription, load_active_delivery};
pub use error::{SensorError, TrackingError, TrackingResult};
pub use photo::{CapturedPhoto, PhotoCaptureService};
pub use position::{
    ChannelPositionSource, PositionFeed, PositionOptions, PositionSource, PositionStream,
};
pub use proximity::{GEOFENCE_RADIUS_KM, GeofenceAlert, evaluate_proximity};
pub use route::{DailyRouteMetrics, DeliverySummary, TrackPoint, summarize_day};
