//! Thread-scoped cache
//!
//! Each thread (one conversation, keyed by response id) stores an
//! aggregate record with its cached files, query history and the last
//! compatibility assessment, plus one hash per file holding that file's
//! loaded segments.

mod manager;
mod merge;
mod record;
mod types;
mod validation;

pub use manager::ThreadCacheManager;
pub use record::{FileRecord, RecordMetadata, ThreadRecord};
pub use types::{
    CacheErrorEntry, CachedFile, ContextUpdate, ThreadCache, ThreadCacheSummary, ThreadContext,
};
