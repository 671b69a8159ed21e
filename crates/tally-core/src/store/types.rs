//! Store type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Key-value backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    #[error("Hash value is not an integer: {0}")]
    NotAnInteger(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Backend not available: {0}")]
    NotAvailable(String),
}

impl StoreError {
    /// Short machine-readable name of the failure
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Command(_) => "command",
            Self::WrongType(_) => "wrong_type",
            Self::NotAnInteger(_) => "not_an_integer",
            Self::Protocol(_) => "protocol",
            Self::NotAvailable(_) => "not_available",
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Protocol(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

/// Store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendType {
    Memory,
    Rest,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Rest => write!(f, "rest"),
        }
    }
}

/// Options for a `set` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expire the key after this long
    pub ttl: Option<Duration>,
    /// Only set if the key does not exist
    pub nx: bool,
    /// Only set if the key already exists
    pub xx: bool,
    /// Keep the existing expiration instead of clearing it
    pub keep_ttl: bool,
}

impl SetOptions {
    /// Plain set with an expiration
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    /// Only write when the key is absent
    pub fn if_absent(mut self) -> Self {
        self.nx = true;
        self
    }

    /// Only write when the key is present
    pub fn if_present(mut self) -> Self {
        self.xx = true;
        self
    }

    /// Preserve the current expiration of an existing key
    pub fn keeping_ttl(mut self) -> Self {
        self.keep_ttl = true;
        self
    }
}

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (or has already expired)
    Missing,
    /// Key exists without an expiration
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Redis `TTL` reply encoding: -2 missing, -1 persistent, else whole seconds
    pub fn as_redis_seconds(&self) -> i64 {
        match self {
            Self::Missing => -2,
            Self::Persistent => -1,
            Self::Expires(remaining) => remaining.as_secs() as i64,
        }
    }

    /// Decode a Redis `PTTL` reply
    pub fn from_redis_millis(value: i64) -> Self {
        match value {
            -2 => Self::Missing,
            v if v < 0 => Self::Persistent,
            v => Self::Expires(Duration::from_millis(v as u64)),
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatistics {
    /// Number of live keys
    pub entry_count: usize,
    /// Reads that found a value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Keys dropped to stay within capacity
    pub evictions: u64,
    /// Keys dropped because their TTL elapsed
    pub expirations: u64,
}

impl StoreStatistics {
    /// Fraction of reads that were hits
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
