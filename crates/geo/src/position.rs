//! Raw samples, accepted positions and accuracy classification.

use serde::{Deserialize, Serialize};

use crate::error::PositionError;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Five-level bucket for a GPS accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyQuality {
    /// Up to 10 m.
    Excellent,
    /// Up to 30 m.
    Good,
    /// Up to 100 m.
    Medium,
    /// Up to 200 m.
    Bad,
    /// Anything worse, including non-finite readings.
    VeryBad,
}

impl AccuracyQuality {
    pub fn from_accuracy(accuracy_m: f64) -> Self {
        // NaN fails every comparison and falls through to VeryBad.
        if accuracy_m <= 10.0 {
            Self::Excellent
        } else if accuracy_m <= 30.0 {
            Self::Good
        } else if accuracy_m <= 100.0 {
            Self::Medium
        } else if accuracy_m <= 200.0 {
            Self::Bad
        } else {
            Self::VeryBad
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Medium => "medium",
            Self::Bad => "bad",
            Self::VeryBad => "very_bad",
        }
    }
}

impl std::fmt::Display for AccuracyQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geolocation sample as delivered by the platform provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RawPositionSample {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            heading: None,
            speed: None,
            timestamp: Some(timestamp),
        }
    }
}

/// Immutable snapshot of one accepted sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPosition {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    accuracy_quality: AccuracyQuality,
    altitude: Option<f64>,
    heading: Option<f64>,
    speed: Option<f64>,
    timestamp: i64,
}

impl GeoPosition {
    /// Build a position from a raw sample, rejecting structurally invalid input.
    pub fn from_sample(sample: &RawPositionSample) -> Result<Self, PositionError> {
        let Some(timestamp) = sample.timestamp else {
            return Err(PositionError::invalid("missing timestamp"));
        };
        if !sample.latitude.is_finite() || !(-90.0..=90.0).contains(&sample.latitude) {
            return Err(PositionError::invalid(format!("latitude {} out of range", sample.latitude)));
        }
        if !sample.longitude.is_finite() || !(-180.0..=180.0).contains(&sample.longitude) {
            return Err(PositionError::invalid(format!("longitude {} out of range", sample.longitude)));
        }
        if !sample.accuracy.is_finite() || sample.accuracy < 0.0 {
            return Err(PositionError::invalid(format!("accuracy {} is not a distance", sample.accuracy)));
        }

        Ok(Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            accuracy_quality: AccuracyQuality::from_accuracy(sample.accuracy),
            altitude: sample.altitude,
            heading: sample.heading,
            speed: sample.speed,
            timestamp,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn accuracy_quality(&self) -> AccuracyQuality {
        self.accuracy_quality
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl std::fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) ±{:.0} m [{}]",
            self.latitude, self.longitude, self.accuracy, self.accuracy_quality
        )
    }
}

/// Haversine distance in meters between two coordinates given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
