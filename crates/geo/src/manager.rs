//! The position gate.

use std::sync::Arc;

use guia_events::{event_names, Observer, ObserverSubject, SubscriptionId};
use serde::Serialize;

use crate::config::PositionConfig;
use crate::error::PositionError;
use crate::position::{GeoPosition, RawPositionSample};

/// How a sample was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionEventKind {
    /// Accepted, tracking interval had elapsed.
    Regular,
    /// Accepted, but sooner than the tracking interval.
    Immediate,
    /// Rejected by the accuracy or distance gate.
    Rejected,
}

impl PositionEventKind {
    /// Event bus topic for this kind.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Regular => event_names::POSITION_UPDATED,
            Self::Immediate => event_names::POSITION_UPDATED_IMMEDIATE,
            Self::Rejected => event_names::POSITION_REJECTED,
        }
    }
}

/// Notification produced for every well-formed sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionEvent {
    pub kind: PositionEventKind,
    /// The new position when accepted, `None` when rejected.
    pub position: Option<GeoPosition>,
    /// The gate that rejected the sample.
    pub error: Option<PositionError>,
}

impl PositionEvent {
    fn accepted(kind: PositionEventKind, position: GeoPosition) -> Self {
        Self {
            kind,
            position: Some(position),
            error: None,
        }
    }

    fn rejected(error: PositionError) -> Self {
        Self {
            kind: PositionEventKind::Rejected,
            position: None,
            error: Some(error),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.kind != PositionEventKind::Rejected
    }
}

/// Accepts or rejects raw samples and tracks the last accepted position.
///
/// `last_modified` only moves on acceptance; rejected samples leave the state
/// untouched but are still announced to subscribers.
pub struct PositionManager {
    config: PositionConfig,
    last_position: Option<GeoPosition>,
    last_modified: Option<i64>,
    observers: ObserverSubject<PositionEvent>,
}

impl PositionManager {
    pub fn new(config: PositionConfig) -> Self {
        Self {
            config,
            last_position: None,
            last_modified: None,
            observers: ObserverSubject::new("position_manager"),
        }
    }

    pub fn config(&self) -> &PositionConfig {
        &self.config
    }

    pub fn last_position(&self) -> Option<&GeoPosition> {
        self.last_position.as_ref()
    }

    /// Timestamp (epoch ms) of the last accepted sample.
    pub fn last_modified(&self) -> Option<i64> {
        self.last_modified
    }

    pub fn subscribe(&mut self, observer: Arc<dyn Observer<PositionEvent>>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn subscribe_fn<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&PositionEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.observers.subscribe_fn(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Run a raw sample through the gates and notify subscribers.
    ///
    /// Returns the emitted event, or `None` when the sample was malformed and
    /// dropped without notification.
    pub fn update(&mut self, sample: &RawPositionSample) -> Option<PositionEvent> {
        let candidate = match GeoPosition::from_sample(sample) {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "dropping position sample");
                return None;
            }
        };

        let event = match self.validate(&candidate) {
            Ok(kind) => {
                tracing::debug!(
                    kind = ?kind,
                    latitude = candidate.latitude(),
                    longitude = candidate.longitude(),
                    accuracy = candidate.accuracy(),
                    "position accepted"
                );
                self.last_modified = Some(candidate.timestamp());
                self.last_position = Some(candidate.clone());
                PositionEvent::accepted(kind, candidate)
            }
            Err(e) => {
                tracing::debug!(error = %e, "position rejected");
                PositionEvent::rejected(e)
            }
        };

        self.observers.notify(&event);
        Some(event)
    }

    fn validate(&self, candidate: &GeoPosition) -> Result<PositionEventKind, PositionError> {
        let quality = candidate.accuracy_quality();
        if self.config.rejects(quality) {
            return Err(PositionError::Accuracy {
                quality,
                accuracy_m: candidate.accuracy(),
            });
        }

        if let Some(last) = &self.last_position {
            let distance_m = last.distance_to(candidate);
            if distance_m < self.config.minimum_distance_change_m {
                return Err(PositionError::Distance {
                    distance_m,
                    minimum_m: self.config.minimum_distance_change_m,
                });
            }
        }

        match self.check_elapsed(candidate.timestamp()) {
            Ok(()) => Ok(PositionEventKind::Regular),
            Err(e) => {
                tracing::debug!(reason = %e, "classifying update as immediate");
                Ok(PositionEventKind::Immediate)
            }
        }
    }

    fn check_elapsed(&self, timestamp: i64) -> Result<(), PositionError> {
        let Some(last_modified) = self.last_modified else {
            return Ok(());
        };

        let elapsed_ms = timestamp.saturating_sub(last_modified);
        if elapsed_ms < self.config.tracking_interval_ms {
            return Err(PositionError::ElapsedTime {
                elapsed_ms,
                interval_ms: self.config.tracking_interval_ms,
            });
        }
        Ok(())
    }

    /// Drop the tracked position and all subscribers.
    pub fn destroy(&mut self) {
        self.last_position = None;
        self.last_modified = None;
        self.observers.clear();
        tracing::info!("position manager destroyed");
    }
}

impl std::fmt::Debug for PositionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionManager")
            .field("config", &self.config)
            .field("last_position", &self.last_position)
            .field("last_modified", &self.last_modified)
            .field("subscribers", &self.observers.len())
            .finish()
    }
}
