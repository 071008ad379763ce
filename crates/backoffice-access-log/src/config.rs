//! Pipeline settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::effective_limit;
use crate::channel::DEFAULT_CHANNEL_CAPACITY;
use crate::consumer::{ConsumerConfig, DEFAULT_BATCH_SIZE};

/// Which backend keeps persisted log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStoreKind {
    #[default]
    Database,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Per-body capture limit; 0 means the 1 KiB fallback
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Requests whose path contains any of these are not captured
    #[serde(default = "default_skip_paths")]
    pub skip_paths: Vec<String>,

    /// Offset of the zone used to read `timestamp[]` list filters
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,

    #[serde(default)]
    pub store: LogStoreKind,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    10 * 1024
}

fn default_skip_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/metrics".to_string(),
        "/system/log".to_string(),
        "/swagger-ui".to_string(),
        "/openapi.json".to_string(),
    ]
}

fn default_timezone_offset_hours() -> i32 {
    8
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
            max_body_bytes: default_max_body_bytes(),
            skip_paths: default_skip_paths(),
            timezone_offset_hours: default_timezone_offset_hours(),
            store: LogStoreKind::default(),
        }
    }
}

impl PipelineConfig {
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            batch_size: self.batch_size,
            flush_interval: Duration::from_secs(self.flush_interval_secs),
        }
    }

    pub fn body_limit(&self) -> usize {
        effective_limit(self.max_body_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, 10_000);
        assert_eq!(config.batch_size, 100);
        assert_eq!(
            config.consumer_config().flush_interval,
            Duration::from_secs(5)
        );
        assert_eq!(config.body_limit(), 10240);
        assert!(config.skip_paths.iter().any(|p| p == "/system/log"));
    }

    #[test]
    fn test_zero_body_limit_falls_back() {
        let config = PipelineConfig {
            max_body_bytes: 0,
            ..Default::default()
        };
        assert_eq!(config.body_limit(), 1024);
    }
}
