//! Position sample validation for the tracking pipeline.
//!
//! Raw geolocation samples are noisy: poor fixes, jitter around a stationary
//! point, bursts of updates. [`PositionManager`] is the gate that decides which
//! samples become the current [`GeoPosition`]:
//!
//! 1. Accuracy gate: reject samples whose [`AccuracyQuality`] is on the
//!    configured reject-list.
//! 2. Distance gate: reject samples closer than the minimum distance to the
//!    last accepted position.
//! 3. Time classification: accepted samples arriving before the tracking
//!    interval has elapsed are flagged [`PositionEventKind::Immediate`].
//!
//! Every outcome, accepted or rejected, is delivered as a [`PositionEvent`] to
//! subscribers. Malformed samples are dropped with a warning and no event.

mod config;
mod error;
mod manager;
mod position;

pub use config::{
    PositionConfig, DEFAULT_MINIMUM_DISTANCE_CHANGE_M, DEFAULT_TRACKING_INTERVAL_MS,
};
pub use error::PositionError;
pub use manager::{PositionEvent, PositionEventKind, PositionManager};
pub use position::{haversine_distance, AccuracyQuality, GeoPosition, RawPositionSample, EARTH_RADIUS_M};
