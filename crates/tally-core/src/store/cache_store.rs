//! Fail-open access to the key-value backend

use super::backend::KeyValueStore;
use super::memory::MemoryStore;
use super::types::{BackendType, KeyTtl, SetOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Store handle shared by the cache and gate layers
///
/// Every backend error is logged and turned into a miss: `None`, `false`,
/// `0` or an empty collection. The cache is an optimization, so nothing
/// here returns an error.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}

impl CacheStore {
    /// Wrap an existing backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// In-memory store without a background sweep
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Arc::new(MemoryStore::new(capacity)))
    }

    /// The wrapped backend
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Which backend is in use
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("kv get {} failed: {}", key, e);
                None
            }
        }
    }

    /// Get and parse a JSON value; unparseable values count as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("kv value at {} is not valid JSON: {}", key, e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let options = SetOptions {
            ttl,
            ..Default::default()
        };
        self.set_with(key, value, &options).await
    }

    pub async fn set_with(&self, key: &str, value: &str, options: &SetOptions) -> bool {
        match self.backend.set(key, value, options).await {
            Ok(written) => written,
            Err(e) => {
                tracing::error!("kv set {} failed: {}", key, e);
                false
            }
        }
    }

    /// Serialize `value` as JSON and store it
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => {
                tracing::error!("failed to serialize value for {}: {}", key, e);
                false
            }
        }
    }

    pub async fn del(&self, key: &str) -> u64 {
        self.backend.del(key).await.unwrap_or_else(|e| {
            tracing::error!("kv del {} failed: {}", key, e);
            0
        })
    }

    pub async fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.backend.hget(key, field).await.unwrap_or_else(|e| {
            tracing::error!("kv hget {}.{} failed: {}", key, field, e);
            None
        })
    }

    /// Set hash fields; false when the backend rejected the write
    pub async fn hset(&self, key: &str, fields: &[(String, String)]) -> bool {
        match self.backend.hset(key, fields).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("kv hset {} failed: {}", key, e);
                false
            }
        }
    }

    pub async fn hgetall(&self, key: &str) -> HashMap<String, String> {
        self.backend.hgetall(key).await.unwrap_or_else(|e| {
            tracing::error!("kv hgetall {} failed: {}", key, e);
            HashMap::new()
        })
    }

    pub async fn hkeys(&self, key: &str) -> Vec<String> {
        self.backend.hkeys(key).await.unwrap_or_else(|e| {
            tracing::error!("kv hkeys {} failed: {}", key, e);
            Vec::new()
        })
    }

    pub async fn hincrby(&self, key: &str, field: &str, by: i64) -> Option<i64> {
        match self.backend.hincrby(key, field, by).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("kv hincrby {}.{} failed: {}", key, field, e);
                None
            }
        }
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.backend.expire(key, ttl).await.unwrap_or_else(|e| {
            tracing::error!("kv expire {} failed: {}", key, e);
            false
        })
    }

    pub async fn ttl(&self, key: &str) -> KeyTtl {
        self.backend.ttl(key).await.unwrap_or_else(|e| {
            tracing::error!("kv ttl {} failed: {}", key, e);
            KeyTtl::Missing
        })
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.backend.exists(key).await.unwrap_or_else(|e| {
            tracing::error!("kv exists {} failed: {}", key, e);
            false
        })
    }

    pub async fn ping(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("kv ping failed: {}", e);
                false
            }
        }
    }
}
