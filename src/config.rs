//! Crate-wide defaults and the aggregated pipeline configuration

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    buffers::BufferPoolConfig,
    error::Result,
    session::{CaptureConfig, SessionConfig},
};

/// Default block alignment (cache line)
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Default maximum number of pooled buffers
pub const DEFAULT_MAX_BUFFERS: usize = 10;

/// Default idle age after which a pooled buffer is evicted
pub const DEFAULT_MAX_BUFFER_AGE: Duration = Duration::from_secs(30);

/// Smallest request served from the pool
pub const DEFAULT_MIN_POOLABLE: usize = 1024;

/// Largest request served from the pool
pub const DEFAULT_MAX_POOLABLE: usize = 10 * 1024 * 1024;

/// Minimum spacing between accepted preview frames (10 fps)
pub const DEFAULT_PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the native-to-managed event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 4;

/// Longest a lifecycle notice may wait for room in a full event channel
pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_millis(250);

/// Application events held for a consumer that is not draining
pub const DEFAULT_EVENT_BACKLOG: usize = 64;

/// Backlog slots preview updates may not take, kept free for photo and
/// lifecycle events
pub const RESERVED_EVENT_SLOTS: usize = 16;

/// Lowest accepted colour temperature in Kelvin
pub const MIN_COLOR_TEMPERATURE: f32 = 2500.0;

/// Highest accepted colour temperature in Kelvin
pub const MAX_COLOR_TEMPERATURE: f32 = 7500.0;

/// Serialize a [`Duration`] as whole milliseconds
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Everything the pipeline consumes from its host, loadable from JSON.
///
/// Missing sections and fields fall back to their defaults, so `{}` is a
/// valid document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pool: BufferPoolConfig,
    pub session: SessionConfig,
    pub capture: CaptureConfig,
}

impl PipelineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Render as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::session::PixelFormat;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.session.preview_interval, DEFAULT_PREVIEW_INTERVAL);
    }

    #[test]
    fn test_durations_are_milliseconds() {
        let json = r#"{ "pool": { "max_age_ms": 500 }, "session": { "preview_interval_ms": 50 } }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.pool.max_age, Duration::from_millis(500));
        assert_eq!(config.session.preview_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_photo_format_parses() {
        let json = r#"{ "capture": { "photo_format": "bgra32" } }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.capture.photo_format, PixelFormat::Bgra32);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_json_str(r#"{ "pool": { "max_buffers": 0 } }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = PipelineConfig::from_json_str("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_json_round_trip() {
        let config = PipelineConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }
}
