//! Key-value storage
//!
//! `KeyValueStore` is the primitive async contract: string values, hashes
//! of string fields, and per-key expiration. Two backends implement it:
//! an in-process `MemoryStore` with LRU eviction and a background expiry
//! sweep, and a `RestStore` speaking the Redis-over-HTTP protocol used by
//! hosted key-value services.
//!
//! Callers do not talk to a backend directly. `CacheStore` wraps the
//! selected backend and converts every backend error into a logged miss,
//! so cache faults never escape as fatal errors.

mod backend;
mod cache_store;
mod connect;
mod memory;
mod rest;
mod types;

pub use backend::KeyValueStore;
#[cfg(test)]
pub use backend::MockKeyValueStore;
pub use cache_store::CacheStore;
pub use connect::connect;
pub use memory::{DEFAULT_MEMORY_CAPACITY, DEFAULT_SWEEP_INTERVAL, MemoryStore};
pub use rest::RestStore;
pub use types::{BackendType, KeyTtl, SetOptions, StoreError, StoreStatistics};

#[cfg(test)]
mod tests;
