//! Tests for the key-value backends

use super::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(f, v)| (f.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_memory_get_set_del() {
    let store = MemoryStore::new(10);

    assert_eq!(store.get("k").await.unwrap(), None);
    assert!(store.set("k", "v", &SetOptions::default()).await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    assert!(store.exists("k").await.unwrap());

    assert_eq!(store.del("k").await.unwrap(), 1);
    assert_eq!(store.del("k").await.unwrap(), 0);
    assert!(!store.exists("k").await.unwrap());

    let stats = store.statistics().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entry_count, 0);
}

#[tokio::test]
async fn test_memory_conditional_set() {
    let store = MemoryStore::new(10);

    assert!(!store.set("k", "v", &SetOptions::default().if_present()).await.unwrap());
    assert!(store.set("k", "first", &SetOptions::default().if_absent()).await.unwrap());
    assert!(!store.set("k", "second", &SetOptions::default().if_absent()).await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));

    assert!(store.set("k", "third", &SetOptions::default().if_present()).await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("third"));
}

#[tokio::test]
async fn test_memory_ttl_expiry() {
    let store = MemoryStore::new(10);

    store
        .set("short", "v", &SetOptions::with_ttl(Duration::from_millis(50)))
        .await
        .unwrap();
    store.set("forever", "v", &SetOptions::default()).await.unwrap();

    assert!(matches!(store.ttl("short").await.unwrap(), KeyTtl::Expires(_)));
    assert_eq!(store.ttl("forever").await.unwrap(), KeyTtl::Persistent);
    assert_eq!(store.ttl("absent").await.unwrap(), KeyTtl::Missing);
    assert_eq!(store.ttl("absent").await.unwrap().as_redis_seconds(), -2);

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(store.get("short").await.unwrap(), None);
    assert_eq!(store.ttl("short").await.unwrap(), KeyTtl::Missing);
    assert_eq!(store.get("forever").await.unwrap().as_deref(), Some("v"));
    assert_eq!(store.statistics().await.expirations, 1);
}

#[tokio::test]
async fn test_memory_keep_ttl() {
    let store = MemoryStore::new(10);
    store
        .set("k", "v1", &SetOptions::with_ttl(Duration::from_secs(60)))
        .await
        .unwrap();
    store
        .set("k", "v2", &SetOptions::default().keeping_ttl())
        .await
        .unwrap();
    assert!(matches!(store.ttl("k").await.unwrap(), KeyTtl::Expires(_)));

    store.set("k", "v3", &SetOptions::default()).await.unwrap();
    assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Persistent);
}

#[tokio::test]
async fn test_memory_expire() {
    let store = MemoryStore::new(10);
    assert!(!store.expire("absent", Duration::from_secs(1)).await.unwrap());

    store.hset("h", &fields(&[("a", "1")])).await.unwrap();
    assert!(store.expire("h", Duration::from_millis(30)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(store.hgetall("h").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_hash_operations() {
    let store = MemoryStore::new(10);

    assert_eq!(store.hset("h", &fields(&[("a", "1"), ("b", "2")])).await.unwrap(), 2);
    assert_eq!(store.hset("h", &fields(&[("b", "3"), ("c", "4")])).await.unwrap(), 1);

    assert_eq!(store.hget("h", "b").await.unwrap().as_deref(), Some("3"));
    assert_eq!(store.hget("h", "z").await.unwrap(), None);
    assert_eq!(store.hkeys("h").await.unwrap(), vec!["a", "b", "c"]);

    let all = store.hgetall("h").await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(store.hgetall("absent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_hincrby() {
    let store = MemoryStore::new(10);
    assert_eq!(store.hincrby("counts", "hits", 1).await.unwrap(), 1);
    assert_eq!(store.hincrby("counts", "hits", 5).await.unwrap(), 6);
    assert_eq!(store.hincrby("counts", "hits", -2).await.unwrap(), 4);

    store.hset("counts", &fields(&[("label", "x")])).await.unwrap();
    let err = store.hincrby("counts", "label", 1).await.unwrap_err();
    assert!(matches!(err, StoreError::NotAnInteger(_)));
}

#[tokio::test]
async fn test_memory_hincrby_overflow_is_an_error() {
    let store = MemoryStore::new(10);
    assert_eq!(store.hincrby("k", "f", i64::MAX).await.unwrap(), i64::MAX);

    let err = store.hincrby("k", "f", 1).await.unwrap_err();
    assert!(matches!(err, StoreError::Command(_)));
    assert_eq!(
        store.hget("k", "f").await.unwrap(),
        Some(i64::MAX.to_string())
    );
}

#[tokio::test]
async fn test_memory_wrong_type() {
    let store = MemoryStore::new(10);
    store.set("s", "v", &SetOptions::default()).await.unwrap();
    store.hset("h", &fields(&[("a", "1")])).await.unwrap();

    assert!(matches!(store.hget("s", "a").await, Err(StoreError::WrongType(_))));
    assert!(matches!(store.get("h").await, Err(StoreError::WrongType(_))));

    // A plain set replaces a hash outright
    store.set("h", "now a string", &SetOptions::default()).await.unwrap();
    assert_eq!(store.get("h").await.unwrap().as_deref(), Some("now a string"));
}

#[tokio::test]
async fn test_memory_lru_eviction_spans_strings_and_hashes() {
    let store = MemoryStore::new(3);

    store.set("a", "1", &SetOptions::default()).await.unwrap();
    store.hset("b", &fields(&[("f", "2")])).await.unwrap();
    store.set("c", "3", &SetOptions::default()).await.unwrap();

    // Touch "a" so "b" becomes least recently used
    store.get("a").await.unwrap();
    store.set("d", "4", &SetOptions::default()).await.unwrap();

    assert!(store.exists("a").await.unwrap());
    assert!(!store.exists("b").await.unwrap());
    assert!(store.exists("c").await.unwrap());
    assert!(store.exists("d").await.unwrap());

    let stats = store.statistics().await;
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.entry_count, 3);
    assert_eq!(store.capacity().await, 3);
}

#[tokio::test]
async fn test_memory_sweep_expired() {
    let store = MemoryStore::new(10);
    for key in ["a", "b"] {
        store
            .set(key, "v", &SetOptions::with_ttl(Duration::from_millis(20)))
            .await
            .unwrap();
    }
    store.set("c", "v", &SetOptions::default()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(store.sweep_expired().await, 2);
    assert_eq!(store.statistics().await.entry_count, 1);
}

#[tokio::test]
async fn test_memory_background_sweeper() {
    let store = MemoryStore::with_sweeper(10, Duration::from_millis(20));
    assert!(store.has_sweeper());
    store
        .set("k", "v", &SetOptions::with_ttl(Duration::from_millis(10)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = store.statistics().await;
    assert_eq!(stats.entry_count, 0);
    assert_eq!(stats.expirations, 1);
}

/// Backend that fails every call
struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Rest
    }
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn set(&self, _: &str, _: &str, _: &SetOptions) -> Result<bool, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn del(&self, _key: &str) -> Result<u64, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn hget(&self, _: &str, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn hset(&self, _: &str, _: &[(String, String)]) -> Result<u64, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn hgetall(&self, _: &str) -> Result<HashMap<String, String>, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn hkeys(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn hincrby(&self, _: &str, _: &str, _: i64) -> Result<i64, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn expire(&self, _: &str, _: Duration) -> Result<bool, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn ttl(&self, _: &str) -> Result<KeyTtl, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn exists(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Connection("down".into()))
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("down".into()))
    }
}

#[tokio::test]
async fn test_cache_store_absorbs_backend_errors() {
    let store = CacheStore::new(Arc::new(UnavailableStore));

    assert_eq!(store.get("k").await, None);
    assert_eq!(store.get_json::<serde_json::Value>("k").await, None);
    assert!(!store.set("k", "v", None).await);
    assert_eq!(store.del("k").await, 0);
    assert_eq!(store.hget("k", "f").await, None);
    assert!(!store.hset("k", &fields(&[("f", "v")])).await);
    assert!(store.hgetall("k").await.is_empty());
    assert!(store.hkeys("k").await.is_empty());
    assert_eq!(store.hincrby("k", "f", 1).await, None);
    assert!(!store.expire("k", Duration::from_secs(1)).await);
    assert_eq!(store.ttl("k").await, KeyTtl::Missing);
    assert!(!store.exists("k").await);
    assert!(!store.ping().await);
}

#[tokio::test]
async fn test_cache_store_json_helpers() {
    let store = CacheStore::in_memory(10);
    let value = serde_json::json!({"files": [], "lastUpdated": 1});

    assert!(store.set_json("k", &value, Some(Duration::from_secs(60))).await);
    assert_eq!(store.get_json::<serde_json::Value>("k").await, Some(value));

    store.set("bad", "{not json", None).await;
    assert_eq!(store.get_json::<serde_json::Value>("bad").await, None);
    assert_eq!(store.backend_type(), BackendType::Memory);
}

#[tokio::test]
async fn test_connect_memory_and_auto_fallback() {
    let store = connect(&crate::config::StoreConfig::memory()).await.unwrap();
    assert_eq!(store.backend_type(), BackendType::Memory);

    let mut config = crate::config::StoreConfig::rest("http://127.0.0.1:9", "token");
    config.request_timeout = Duration::from_millis(200);
    assert!(connect(&config).await.is_err());

    config.backend = crate::config::StoreBackend::Auto;
    let store = connect(&config).await.unwrap();
    assert_eq!(store.backend_type(), BackendType::Memory);
}
