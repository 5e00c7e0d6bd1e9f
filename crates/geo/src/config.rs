//! Position gate configuration.

use serde::{Deserialize, Serialize};

use crate::position::AccuracyQuality;

/// Minimum movement, in meters, for a sample to count as a new position.
pub const DEFAULT_MINIMUM_DISTANCE_CHANGE_M: f64 = 20.0;

/// Minimum time between regular updates, in milliseconds.
pub const DEFAULT_TRACKING_INTERVAL_MS: i64 = 50_000;

/// Rules applied by [`crate::PositionManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Accuracy buckets that are rejected outright.
    pub rejected_accuracy: Vec<AccuracyQuality>,
    pub minimum_distance_change_m: f64,
    pub tracking_interval_ms: i64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self::non_handheld()
    }
}

impl PositionConfig {
    /// Phones and tablets have GPS, so anything from medium down is noise.
    pub fn handheld() -> Self {
        Self {
            rejected_accuracy: vec![
                AccuracyQuality::Medium,
                AccuracyQuality::Bad,
                AccuracyQuality::VeryBad,
            ],
            minimum_distance_change_m: DEFAULT_MINIMUM_DISTANCE_CHANGE_M,
            tracking_interval_ms: DEFAULT_TRACKING_INTERVAL_MS,
        }
    }

    /// Laptops and desktops geolocate over Wi-Fi/IP; medium is the best they get.
    pub fn non_handheld() -> Self {
        Self {
            rejected_accuracy: vec![AccuracyQuality::Bad, AccuracyQuality::VeryBad],
            minimum_distance_change_m: DEFAULT_MINIMUM_DISTANCE_CHANGE_M,
            tracking_interval_ms: DEFAULT_TRACKING_INTERVAL_MS,
        }
    }

    pub fn rejects(&self, quality: AccuracyQuality) -> bool {
        self.rejected_accuracy.contains(&quality)
    }
}
