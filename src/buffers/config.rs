//! Buffer pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    duration_ms, DEFAULT_ALIGNMENT, DEFAULT_MAX_BUFFERS, DEFAULT_MAX_BUFFER_AGE,
    DEFAULT_MAX_POOLABLE, DEFAULT_MIN_POOLABLE,
};

/// Configuration for the capture buffer pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    /// Maximum number of pooled buffers across all buckets
    pub max_buffers: usize,
    /// Idle time after which an unused buffer is evicted
    #[serde(with = "duration_ms", rename = "max_age_ms")]
    pub max_age: Duration,
    /// Requests smaller than this bypass the pool
    pub min_poolable: usize,
    /// Requests larger than this bypass the pool
    pub max_poolable: usize,
    /// Alignment of every block
    pub alignment: usize,
    /// Run `maintain(false)` on a background thread every `max_age / 2`
    pub background_maintenance: bool,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            max_buffers: DEFAULT_MAX_BUFFERS,
            max_age: DEFAULT_MAX_BUFFER_AGE,
            min_poolable: DEFAULT_MIN_POOLABLE,
            max_poolable: DEFAULT_MAX_POOLABLE,
            alignment: DEFAULT_ALIGNMENT,
            background_maintenance: true,
        }
    }
}

impl BufferPoolConfig {
    /// Create a configuration with default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum pooled buffer count
    pub fn with_max_buffers(mut self, count: usize) -> Self {
        self.max_buffers = count;
        self
    }

    /// Set maximum idle age
    pub fn with_max_age(mut self, age: Duration) -> Self {
        self.max_age = age;
        self
    }

    /// Set the poolable size window
    pub fn with_poolable_range(mut self, min: usize, max: usize) -> Self {
        self.min_poolable = min;
        self.max_poolable = max;
        self
    }

    /// Set block alignment
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Enable or disable the background maintenance thread
    pub fn with_background_maintenance(mut self, enable: bool) -> Self {
        self.background_maintenance = enable;
        self
    }

    /// Whether a request of `size` bytes is served from the pool
    pub fn is_poolable(&self, size: usize) -> bool {
        size >= self.min_poolable && size <= self.max_poolable
    }

    /// Interval between periodic maintenance passes
    pub fn maintenance_interval(&self) -> Duration {
        (self.max_age / 2).max(Duration::from_millis(1))
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::DaguerreError;

        if self.max_buffers == 0 {
            return Err(DaguerreError::invalid_parameter(
                "max_buffers",
                "Max buffers cannot be zero",
            ));
        }

        if self.min_poolable == 0 {
            return Err(DaguerreError::invalid_parameter(
                "min_poolable",
                "Minimum poolable size cannot be zero",
            ));
        }

        if self.min_poolable > self.max_poolable {
            return Err(DaguerreError::invalid_parameter(
                "min_poolable",
                "Minimum poolable size cannot exceed maximum",
            ));
        }

        if self.max_poolable.checked_next_power_of_two().is_none() {
            return Err(DaguerreError::invalid_parameter(
                "max_poolable",
                "Maximum poolable size has no power-of-two bucket",
            ));
        }

        if !self.alignment.is_power_of_two() {
            return Err(DaguerreError::invalid_parameter(
                "alignment",
                "Alignment must be a power of two",
            ));
        }

        if self.max_age.is_zero() {
            return Err(DaguerreError::invalid_parameter(
                "max_age",
                "Max age must be positive",
            ));
        }

        Ok(())
    }
}

/// Builder pattern for buffer pool configuration
#[derive(Debug, Default)]
pub struct BufferPoolConfigBuilder {
    config: BufferPoolConfig,
}

impl BufferPoolConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum buffer count
    pub fn max_buffers(mut self, count: usize) -> Self {
        self.config.max_buffers = count;
        self
    }

    /// Set maximum idle age
    pub fn max_age(mut self, age: Duration) -> Self {
        self.config.max_age = age;
        self
    }

    /// Set minimum poolable size
    pub fn min_poolable(mut self, size: usize) -> Self {
        self.config.min_poolable = size;
        self
    }

    /// Set maximum poolable size
    pub fn max_poolable(mut self, size: usize) -> Self {
        self.config.max_poolable = size;
        self
    }

    /// Set alignment
    pub fn alignment(mut self, alignment: usize) -> Self {
        self.config.alignment = alignment;
        self
    }

    /// Disable the background maintenance thread
    pub fn manual_maintenance(mut self) -> Self {
        self.config.background_maintenance = false;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::error::Result<BufferPoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BufferPoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_buffers, 10);
        assert_eq!(config.maintenance_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_builder_rejects_inverted_range() {
        let result = BufferPoolConfigBuilder::new()
            .min_poolable(4096)
            .max_poolable(1024)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_poolable_window_is_inclusive() {
        let config = BufferPoolConfig::new().with_poolable_range(1024, 4096);
        assert!(config.is_poolable(1024));
        assert!(config.is_poolable(4096));
        assert!(!config.is_poolable(1023));
        assert!(!config.is_poolable(4097));
    }
}
