//! Thread cache manager
//!
//! Owns the read-modify-write protocol for everything stored under a
//! thread id. It is the only writer of the thread key families.
//!
//! Two turns on the same thread may race; the last write wins. The store
//! offers no transactions and a conversation normally has one turn in
//! flight at a time.

use super::record::ThreadRecord;
use super::types::{CachedFile, ContextUpdate, ThreadCache, ThreadCacheSummary, ThreadContext};
use super::validation::decode_record_str;
use crate::compat::CompatibilityMetadata;
use crate::config::ThreadConfig;
use crate::file_id::normalize_file_id;
use crate::keys::{thread_file_key, thread_meta_key, ttl};
use crate::store::CacheStore;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Reads and merges per-thread cache state
#[derive(Debug, Clone)]
pub struct ThreadCacheManager {
    store: CacheStore,
    config: ThreadConfig,
}

impl ThreadCacheManager {
    /// Create a manager with default retention rules
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            config: ThreadConfig::default(),
        }
    }

    /// Override the retention rules
    pub fn with_config(mut self, config: ThreadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    /// Read the aggregate, noting whether validation found problems
    async fn read(&self, thread_id: &str) -> Option<(ThreadCache, bool)> {
        let key = thread_meta_key(thread_id);
        let Some(raw) = self.store.get(&key).await else {
            debug!("thread cache miss for {}", thread_id);
            return None;
        };

        let decoded = decode_record_str(&raw);
        let dirty = !decoded.problems.is_empty();
        let mut cache = ThreadCache::from(decoded.record);
        for problem in decoded.problems {
            warn!("invalid thread data for {}: {}", thread_id, problem);
            cache.record_error(problem);
        }
        debug!(
            "thread cache hit for {}: {} files",
            thread_id,
            cache.files().len()
        );
        Some((cache, dirty))
    }

    /// Read the aggregate, writing back any validation diagnostics
    pub async fn get_thread(&self, thread_id: &str) -> Option<ThreadCache> {
        let (cache, dirty) = self.read(thread_id).await?;
        if dirty {
            self.persist(thread_id, &cache).await;
        }
        Some(cache)
    }

    async fn persist(&self, thread_id: &str, cache: &ThreadCache) -> bool {
        let key = thread_meta_key(thread_id);
        let record = ThreadRecord::from(cache);
        self.store
            .set_json(&key, &record, Some(ttl::THREAD_DATA))
            .await
    }

    /// Files cached for a thread
    ///
    /// A corrupted record yields an empty list, and the problem is written
    /// into the record's diagnostics.
    pub async fn get_cached_files(&self, thread_id: &str) -> Vec<CachedFile> {
        self.get_thread(thread_id)
            .await
            .map(|cache| cache.files().to_vec())
            .unwrap_or_default()
    }

    /// One file read from its granular segment hash
    pub async fn get_cached_file(&self, thread_id: &str, file_id: &str) -> Option<CachedFile> {
        let file_id = normalize_file_id(file_id);
        let fields = self
            .store
            .hgetall(&thread_file_key(thread_id, file_id))
            .await;
        if fields.is_empty() {
            return None;
        }

        let mut file = CachedFile::new(file_id);
        for (segment, raw) in fields {
            match serde_json::from_str(&raw) {
                Ok(payload) => file.insert_segment(segment, payload),
                Err(e) => warn!(
                    "unreadable segment {} of {} in thread {}: {}",
                    segment, file_id, thread_id, e
                ),
            }
        }
        Some(file)
    }

    /// Merge newly identified or loaded files into a thread
    ///
    /// Supplied compatibility metadata replaces the stored value. Returns
    /// false if any write failed.
    pub async fn update_with_files(
        &self,
        thread_id: &str,
        new_files: &[CachedFile],
        compatibility_metadata: Option<CompatibilityMetadata>,
    ) -> bool {
        let mut cache = self
            .read(thread_id)
            .await
            .map(|(cache, _)| cache)
            .unwrap_or_default();
        let mut metadata = compatibility_metadata;

        let evicted = cache.enforce_year_consistency(new_files, metadata.as_mut());
        if !evicted.is_empty() {
            warn!(
                "prevented mixing incompatible years in thread {}: evicted {:?}",
                thread_id, evicted
            );
        }

        cache.merge_files(new_files);
        if let Some(metadata) = metadata {
            cache.compatibility_metadata = Some(metadata);
        }
        cache.last_updated = Utc::now();

        let mut ok = self.persist(thread_id, &cache).await;
        for file in new_files {
            ok &= self.write_segments(thread_id, file).await;
        }

        if ok {
            info!(
                "updated thread {} with {} files ({} cached)",
                thread_id,
                new_files.len(),
                cache.files().len()
            );
        } else {
            warn!("thread {} update was not fully persisted", thread_id);
        }
        ok
    }

    /// Write a file's loaded segments to its granular hash
    async fn write_segments(&self, thread_id: &str, file: &CachedFile) -> bool {
        let mut fields = Vec::with_capacity(file.data().len());
        for (segment, payload) in file.data() {
            match serde_json::to_string(payload) {
                Ok(raw) => fields.push((segment.clone(), raw)),
                Err(e) => warn!("failed to serialize segment {} of {}: {}", segment, file.id(), e),
            }
        }
        if fields.is_empty() {
            return true;
        }

        let key = thread_file_key(thread_id, file.id());
        self.store.hset(&key, &fields).await && self.store.expire(&key, ttl::THREAD_DATA).await
    }

    /// Conversation history for a thread
    ///
    /// A thread with history counts as a follow-up unless stored otherwise.
    pub async fn get_context(&self, thread_id: &str) -> ThreadContext {
        let Some((cache, _)) = self.read(thread_id).await else {
            return ThreadContext::default();
        };
        ThreadContext {
            is_follow_up: cache
                .is_follow_up
                .unwrap_or(!cache.previous_queries.is_empty()),
            previous_queries: cache.previous_queries,
            raw_queries: cache.raw_queries,
            last_query_time: cache.last_query_time,
        }
    }

    /// Prepend new queries and update the follow-up state
    ///
    /// Each history list keeps the configured number of most recent entries.
    pub async fn update_context(&self, thread_id: &str, update: ContextUpdate) -> bool {
        let mut cache = self
            .read(thread_id)
            .await
            .map(|(cache, _)| cache)
            .unwrap_or_default();
        let limit = self.config.history_limit;

        cache.previous_queries = prepend(update.previous_queries, cache.previous_queries, limit);
        cache.raw_queries = prepend(update.raw_queries, cache.raw_queries, limit);
        if let Some(is_follow_up) = update.is_follow_up {
            cache.is_follow_up = Some(is_follow_up);
        }
        if let Some(time) = update.last_query_time {
            cache.last_query_time = Some(time);
        }
        cache.last_updated = Utc::now();

        self.persist(thread_id, &cache).await
    }

    pub async fn get_compatibility_metadata(&self, thread_id: &str) -> Option<CompatibilityMetadata> {
        self.read(thread_id).await?.0.compatibility_metadata
    }

    /// Whether stored metadata exists, matches `current_version`, and is
    /// within the freshness window
    pub async fn is_compatibility_metadata_valid(&self, thread_id: &str, current_version: &str) -> bool {
        match self.get_compatibility_metadata(thread_id).await {
            Some(metadata) => {
                metadata.is_fresh(current_version, self.config.freshness_window, Utc::now())
            }
            None => false,
        }
    }

    /// Clear stored compatibility metadata, keeping cached files
    pub async fn reset_compatibility(&self, thread_id: &str) -> bool {
        let Some((mut cache, _)) = self.read(thread_id).await else {
            return false;
        };
        if cache.compatibility_metadata.take().is_none() {
            return true;
        }
        cache.last_updated = Utc::now();
        info!("reset compatibility metadata for thread {}", thread_id);
        self.persist(thread_id, &cache).await
    }

    /// Whether every id is already cached for the thread
    pub async fn are_files_cached<S: AsRef<str>>(&self, thread_id: &str, file_ids: &[S]) -> bool {
        let Some((cache, _)) = self.read(thread_id).await else {
            return file_ids.is_empty();
        };
        file_ids.iter().all(|id| cache.file(id.as_ref()).is_some())
    }

    pub async fn summary(&self, thread_id: &str) -> Option<ThreadCacheSummary> {
        let (cache, _) = self.read(thread_id).await?;
        Some(ThreadCacheSummary {
            thread_id: thread_id.to_string(),
            file_ids: cache.file_ids(),
            loaded_segments: cache
                .files()
                .iter()
                .map(|f| (f.id().to_string(), f.loaded_segments().clone()))
                .collect(),
            history_length: cache.previous_queries.len(),
            has_compatibility_metadata: cache.compatibility_metadata.is_some(),
            is_fully_compatible: cache
                .compatibility_metadata
                .as_ref()
                .map(|m| m.is_fully_compatible),
            mapping_version: cache
                .compatibility_metadata
                .as_ref()
                .map(|m| m.mapping_version.clone()),
            cache_error_count: cache.cache_errors.len(),
            last_updated: cache.last_updated,
        })
    }

    /// Copy a thread's state to a newly issued thread id
    ///
    /// Used when the upstream model hands out a new response id for the
    /// same conversation. Returns false when there is nothing to copy or a
    /// write failed.
    pub async fn carry_forward(&self, previous_id: &str, next_id: &str) -> bool {
        if previous_id == next_id {
            return true;
        }
        let Some((mut cache, _)) = self.read(previous_id).await else {
            debug!("nothing to carry forward from thread {}", previous_id);
            return false;
        };
        cache.last_updated = Utc::now();

        let mut ok = self.persist(next_id, &cache).await;
        for file_id in cache.file_ids() {
            let fields: Vec<(String, String)> = self
                .store
                .hgetall(&thread_file_key(previous_id, &file_id))
                .await
                .into_iter()
                .collect();
            if fields.is_empty() {
                continue;
            }
            let key = thread_file_key(next_id, &file_id);
            ok &= self.store.hset(&key, &fields).await
                && self.store.expire(&key, ttl::THREAD_DATA).await;
        }

        info!("carried thread {} forward to {}", previous_id, next_id);
        ok
    }
}

/// `new` followed by `old`, truncated to `limit`
fn prepend(new: Vec<String>, old: Vec<String>, limit: usize) -> Vec<String> {
    new.into_iter().chain(old).take(limit).collect()
}
