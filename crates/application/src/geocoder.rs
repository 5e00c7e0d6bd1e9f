//! Reverse-geocoding seam.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    #[error("reverse geocoding request failed: {0}")]
    Request(String),

    #[error("no address found for ({latitude:.6}, {longitude:.6})")]
    NotFound { latitude: f64, longitude: f64 },
}

/// Resolves coordinates to a raw provider payload.
///
/// Implementations perform I/O; the pipeline awaits them outside of any
/// component state.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<serde_json::Value, GeocodeError>;
}

/// Replays a fixed sequence of payloads, one per call.
///
/// Useful for simulations and tests; once exhausted every call is `NotFound`.
#[derive(Debug, Default)]
pub struct ScriptedGeocoder {
    responses: Mutex<VecDeque<Result<serde_json::Value, GeocodeError>>>,
}

impl ScriptedGeocoder {
    pub fn new(payloads: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(payloads.into_iter().map(Ok).collect()),
        }
    }

    pub fn push(&self, response: Result<serde_json::Value, GeocodeError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ReverseGeocoder for ScriptedGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<serde_json::Value, GeocodeError> {
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or(Err(GeocodeError::NotFound {
            latitude,
            longitude,
        }))
    }
}
