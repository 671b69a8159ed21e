//! Key-value backend trait

use super::types::{BackendType, KeyTtl, SetOptions, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Redis-shaped key-value backend
///
/// Every operation is atomic for a single key. Nothing spans keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Which backend this is
    fn backend_type(&self) -> BackendType;

    /// Get a string value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a string value; returns false when an `nx`/`xx` condition blocked the write
    async fn set(&self, key: &str, value: &str, options: &SetOptions) -> Result<bool, StoreError>;

    /// Delete a key; returns the number of keys removed
    async fn del(&self, key: &str) -> Result<u64, StoreError>;

    /// Get one field of a hash
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Set fields on a hash, creating it if needed; returns the number of new fields
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, StoreError>;

    /// Get every field of a hash (empty when the key is missing)
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// List the field names of a hash
    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Increment an integer hash field, returning the new value
    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError>;

    /// Set a key's expiration; false when the key does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remaining lifetime of a key
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Whether a key exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}
