//! Configuration model

use crate::store::{DEFAULT_MEMORY_CAPACITY, DEFAULT_SWEEP_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Key-value store selection and tuning
    pub store: StoreConfig,
    /// Thread cache retention rules
    pub thread: ThreadConfig,
    /// Topic mapping location and overrides
    pub compatibility: CompatibilityConfig,
    /// Comparison and topic-drift heuristics
    pub gate: GateConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Which key-value backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote store when configured and reachable, memory otherwise
    #[default]
    Auto,
    /// Always the in-process store
    Memory,
    /// Always the remote store
    Rest,
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// REST endpoint of the remote store
    pub rest_url: Option<String>,
    /// Bearer token for the remote store
    pub rest_token: Option<String>,
    /// Maximum keys held by the memory store
    pub memory_capacity: usize,
    /// Interval between memory store expiry sweeps
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Per-request timeout for the remote store
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Auto,
            rest_url: None,
            rest_token: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    /// In-memory store only
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    /// Remote store at `url`
    pub fn rest(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Rest,
            rest_url: Some(url.into()),
            rest_token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Whether both the remote URL and token are present
    pub fn has_rest(&self) -> bool {
        self.rest_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.rest_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Thread cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Entries kept in each query history list
    pub history_limit: usize,
    /// Age after which stored compatibility metadata is stale
    #[serde(with = "humantime_serde")]
    pub freshness_window: Duration,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            history_limit: 5,
            freshness_window: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Topic mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    /// Canonical topic mapping artifact
    pub mapping_path: Option<PathBuf>,
    /// Question ids whose topics are never comparable across years
    pub forced_non_comparable: Vec<String>,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            mapping_path: None,
            forced_non_comparable: vec!["1".to_string(), "2".to_string(), "3".to_string()],
        }
    }
}

/// Comparison gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Word overlap ratio below which a query counts as a new topic
    pub new_topic_threshold: f64,
    /// Words of this length or shorter are ignored by the overlap check
    pub min_word_length: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            new_topic_threshold: 0.15,
            min_word_length: 3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
