//! Tally Core Library
//!
//! This crate provides the core functionality of Tally: a thread-scoped
//! cache of survey data files over a pluggable key-value store, and a
//! compatibility gate that stops cross-year comparisons the survey design
//! does not support.

pub mod compat;
pub mod config;
pub mod error;
pub mod file_id;
pub mod gate;
pub mod keys;
pub mod store;
pub mod thread;
pub mod turn;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use compat::{
    CompatibilityIndex, CompatibilityMetadata, ComparablePairs, FileMetadata, IndexLoader,
    TopicMappingArtifact,
};
pub use config::{TallyConfig, load_config};
pub use error::{TallyError, TallyResult};
pub use file_id::{FileId, normalize_file_id};
pub use gate::{
    CompatibilityGate, CompatibilitySource, GateDecision, GateOutcome, IncompatibleComparison,
};
pub use store::{CacheStore, KeyValueStore, MemoryStore, RestStore, connect};
pub use thread::{CachedFile, ContextUpdate, ThreadCache, ThreadCacheManager, ThreadContext};
pub use turn::{
    FileIdentifier, ProcessedQuery, ProcessedQueryResult, SegmentLoader, TurnCoordinator,
    TurnOutcome, TurnRequest,
};
