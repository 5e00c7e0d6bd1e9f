//! Outcomes of position validation.

use serde::Serialize;
use thiserror::Error;

use crate::position::AccuracyQuality;

/// Why a sample was not accepted as a regular update.
///
/// These are reported through [`crate::PositionEvent`], never returned to the
/// caller of [`crate::PositionManager::update`] as failures.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionError {
    /// Sample accuracy is in the reject-list.
    #[error("accuracy {accuracy_m:.1} m ({quality}) is not accepted")]
    Accuracy {
        quality: AccuracyQuality,
        accuracy_m: f64,
    },

    /// Sample is too close to the last accepted position.
    #[error("moved {distance_m:.1} m, below the {minimum_m:.1} m minimum")]
    Distance { distance_m: f64, minimum_m: f64 },

    /// Sample arrived before the tracking interval elapsed.
    #[error("{elapsed_ms} ms since last update, tracking interval is {interval_ms} ms")]
    ElapsedTime { elapsed_ms: i64, interval_ms: i64 },

    /// Sample is structurally unusable.
    #[error("invalid position sample: {reason}")]
    InvalidPosition { reason: String },
}

impl PositionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            reason: reason.into(),
        }
    }
}
