//! Pipeline configuration.

use std::path::{Path, PathBuf};

use guia_address::AddressCacheConfig;
use guia_geo::PositionConfig;
use guia_speech::{AnnouncerConfig, SpeechQueueConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PriorityTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything a [`crate::TrackingPipeline`] is built from.
///
/// Every section is optional in JSON; missing sections keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub position: PositionConfig,
    pub address_cache: AddressCacheConfig,
    pub speech_queue: SpeechQueueConfig,
    pub announcer: AnnouncerConfig,
    pub priorities: PriorityTable,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "pipeline config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guia_address::AddressField;
    use guia_geo::AccuracyQuality;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(PipelineConfig::from_json_str("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_sections_override_independently() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "position": {"rejected_accuracy": ["medium", "bad", "very_bad"]},
                "address_cache": {"capacity": 10, "tracked_fields": ["bairro"]},
                "speech_queue": {"ttl_ms": 10000}
            }"#,
        )
        .unwrap();

        assert!(config.position.rejects(AccuracyQuality::Medium));
        assert_eq!(config.address_cache.capacity, 10);
        assert_eq!(config.address_cache.ttl_ms, AddressCacheConfig::default().ttl_ms);
        assert_eq!(config.address_cache.tracked_fields, vec![AddressField::Bairro]);
        assert_eq!(config.speech_queue.ttl_ms, 10_000);
        assert_eq!(config.speech_queue.capacity, SpeechQueueConfig::default().capacity);
    }

    #[test]
    fn test_parse_error() {
        let err = PipelineConfig::from_json_str(r#"{"position": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/guia.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
        assert!(err.to_string().contains("/nonexistent/guia.json"));
    }
}
