//! In-process key-value backend
//!
//! Strings and hashes share one LRU-ordered keyspace bounded by a maximum
//! entry count. Expired keys are dropped lazily on access and by a
//! periodic sweep task.

use super::backend::KeyValueStore;
use super::types::{BackendType, KeyTtl, SetOptions, StoreError, StoreStatistics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Default maximum number of keys held in memory
pub const DEFAULT_MEMORY_CAPACITY: usize = 1000;

/// Default interval between expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
enum SlotValue {
    Text(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn text(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: SlotValue::Text(value.into()),
            expires_at,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
struct Inner {
    slots: LruCache<String, Slot>,
    stats: StoreStatistics,
}

impl Inner {
    /// Drop `key` if its TTL has elapsed
    fn purge_if_expired(&mut self, key: &str, now: DateTime<Utc>) {
        if self.slots.peek(key).is_some_and(|slot| slot.is_expired(now)) {
            self.slots.pop(key);
            self.stats.expirations += 1;
        }
    }

    fn insert(&mut self, key: &str, slot: Slot) {
        if let Some((evicted, _)) = self.slots.push(key.to_string(), slot) {
            if evicted != key {
                tracing::debug!("memory store evicted least recently used key {}", evicted);
                self.stats.evictions += 1;
            }
        }
        self.stats.entry_count = self.slots.len();
    }

    fn record_read(&mut self, found: bool) {
        if found {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.slots.pop(key);
        }
        self.stats.expirations += expired.len() as u64;
        self.stats.entry_count = self.slots.len();
        expired.len()
    }
}

/// In-memory key-value store with LRU eviction
#[derive(Debug)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    sweeper: Option<JoinHandle<()>>,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` keys
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slots: LruCache::new(capacity),
                stats: StoreStatistics::default(),
            })),
            sweeper: None,
        }
    }

    /// Create a store and start its background expiry sweep
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sweeper(capacity: usize, interval: Duration) -> Self {
        let mut store = Self::new(capacity);
        store.sweeper = Some(spawn_sweeper(Arc::downgrade(&store.inner), interval));
        store
    }

    /// Whether a background sweep task is attached
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Remove every expired key now; returns how many were dropped
    pub async fn sweep_expired(&self) -> usize {
        self.inner.lock().await.sweep(Utc::now())
    }

    /// Snapshot of the store statistics
    pub async fn statistics(&self) -> StoreStatistics {
        let inner = self.inner.lock().await;
        let mut stats = inner.stats.clone();
        stats.entry_count = inner.slots.len();
        stats
    }

    /// Maximum number of keys
    pub async fn capacity(&self) -> usize {
        self.inner.lock().await.slots.cap().get()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

fn spawn_sweeper(inner: Weak<Mutex<Inner>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let removed = inner.lock().await.sweep(Utc::now());
            if removed > 0 {
                tracing::debug!("memory store sweep removed {} expired keys", removed);
            }
        }
    })
}

fn expiry_from(ttl: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl).ok().map(|ttl| now + ttl)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, Utc::now());

        let value = match inner.slots.get(key) {
            Some(Slot {
                value: SlotValue::Text(text),
                ..
            }) => Some(text.clone()),
            Some(_) => return Err(wrong_type(key)),
            None => None,
        };
        inner.record_read(value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, options: &SetOptions) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, now);

        let existing = inner.slots.peek(key);
        if (options.nx && existing.is_some()) || (options.xx && existing.is_none()) {
            return Ok(false);
        }

        let expires_at = if options.keep_ttl {
            existing.and_then(|slot| slot.expires_at)
        } else {
            options.ttl.and_then(|ttl| expiry_from(ttl, now))
        };
        inner.insert(key, Slot::text(value, expires_at));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, now);
        let removed = inner.slots.pop(key).is_some();
        inner.stats.entry_count = inner.slots.len();
        Ok(u64::from(removed))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, Utc::now());

        let value = match inner.slots.get(key) {
            Some(Slot {
                value: SlotValue::Hash(map),
                ..
            }) => map.get(field).cloned(),
            Some(_) => return Err(wrong_type(key)),
            None => None,
        };
        inner.record_read(value.is_some());
        Ok(value)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.purge_if_expired(key, Utc::now());

        match inner.slots.get_mut(key) {
            Some(Slot {
                value: SlotValue::Hash(map),
                ..
            }) => {
                let mut added = 0;
                for (field, value) in fields {
                    if map.insert(field.clone(), value.clone()).is_none() {
                        added += 1;
                    }
                }
                Ok(added)
            }
            Some(_) => Err(wrong_type(key)),
            None => {
                let map: HashMap<String, String> = fields.iter().cloned().collect();
                let added = map.len() as u64;
                inner.insert(
                    key,
                    Slot {
                        value: SlotValue::Hash(map),
                        expires_at: None,
                    },
                );
                Ok(added)
            }
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, Utc::now());

        let map = match inner.slots.get(key) {
            Some(Slot {
                value: SlotValue::Hash(map),
                ..
            }) => Some(map.clone()),
            Some(_) => return Err(wrong_type(key)),
            None => None,
        };
        inner.record_read(map.is_some());
        Ok(map.unwrap_or_default())
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.hgetall(key).await?.into_keys().collect();
        keys.sort();
        Ok(keys)
    }

    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.purge_if_expired(key, Utc::now());

        match inner.slots.get_mut(key) {
            Some(Slot {
                value: SlotValue::Hash(map),
                ..
            }) => {
                let current = match map.get(field) {
                    Some(raw) => raw
                        .parse::<i64>()
                        .map_err(|_| StoreError::NotAnInteger(format!("{}.{}", key, field)))?,
                    None => 0,
                };
                let next = current.checked_add(by).ok_or_else(|| {
                    StoreError::Command(format!(
                        "increment or decrement would overflow: {}.{}",
                        key, field
                    ))
                })?;
                map.insert(field.to_string(), next.to_string());
                Ok(next)
            }
            Some(_) => Err(wrong_type(key)),
            None => {
                let mut map = HashMap::new();
                map.insert(field.to_string(), by.to_string());
                inner.insert(
                    key,
                    Slot {
                        value: SlotValue::Hash(map),
                        expires_at: None,
                    },
                );
                Ok(by)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, now);

        match inner.slots.peek_mut(key) {
            Some(slot) => {
                slot.expires_at = expiry_from(ttl, now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, now);

        Ok(match inner.slots.peek(key) {
            None => KeyTtl::Missing,
            Some(Slot {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Slot {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires((*at - now).to_std().unwrap_or_default()),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.purge_if_expired(key, Utc::now());
        Ok(inner.slots.contains(key))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
