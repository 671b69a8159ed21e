//! Thread cache domain types

use crate::compat::CompatibilityMetadata;
use crate::file_id::{FileId, normalize_file_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A dataset file cached for a thread, with whichever segments are loaded
///
/// Every key in `data` is a loaded segment and every loaded segment is
/// available. The fields are private so that only the methods below can
/// change them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedFile {
    id: String,
    data: BTreeMap<String, Value>,
    loaded_segments: BTreeSet<String>,
    available_segments: BTreeSet<String>,
}

impl CachedFile {
    /// Empty file entry; a trailing `.json` is stripped from the id
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: normalize_file_id(id.as_ref()).to_string(),
            ..Default::default()
        }
    }

    /// Declare segments that exist for this file without loading them
    pub fn with_available_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_segments
            .extend(segments.into_iter().map(Into::into));
        self
    }

    /// Builder form of [`CachedFile::insert_segment`]
    pub fn with_segment(mut self, segment: impl Into<String>, payload: Value) -> Self {
        self.insert_segment(segment, payload);
        self
    }

    /// Store a segment payload, replacing any previous one
    pub fn insert_segment(&mut self, segment: impl Into<String>, payload: Value) {
        let segment = segment.into();
        self.available_segments.insert(segment.clone());
        self.loaded_segments.insert(segment.clone());
        self.data.insert(segment, payload);
    }

    /// Record that a segment exists without loading it
    pub fn mark_available(&mut self, segment: impl Into<String>) {
        self.available_segments.insert(segment.into());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Survey year taken from the id
    pub fn year(&self) -> Option<u16> {
        FileId::year_of(&self.id)
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn segment(&self, segment: &str) -> Option<&Value> {
        self.data.get(segment)
    }

    pub fn loaded_segments(&self) -> &BTreeSet<String> {
        &self.loaded_segments
    }

    pub fn available_segments(&self) -> &BTreeSet<String> {
        &self.available_segments
    }

    pub fn is_loaded(&self, segment: &str) -> bool {
        self.loaded_segments.contains(segment)
    }

    /// Requested segments that still have to be loaded
    pub fn missing_segments<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        requested
            .iter()
            .map(|segment| segment.as_ref())
            .filter(|segment| !self.is_loaded(segment))
            .map(str::to_string)
            .collect()
    }

    /// Fold another copy of the same file into this one
    ///
    /// Segment sets are unioned; payloads from `incoming` replace ours.
    pub fn merge_from(&mut self, incoming: &CachedFile) {
        self.available_segments
            .extend(incoming.available_segments.iter().cloned());
        self.loaded_segments
            .extend(incoming.loaded_segments.iter().cloned());
        for (segment, payload) in &incoming.data {
            self.data.insert(segment.clone(), payload.clone());
        }
    }

    /// Rebuild a file from stored parts, repairing any broken invariant
    pub(crate) fn from_parts(
        id: &str,
        data: BTreeMap<String, Value>,
        loaded: impl IntoIterator<Item = String>,
        available: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut file = Self::new(id);
        file.loaded_segments.extend(loaded);
        file.loaded_segments.extend(data.keys().cloned());
        file.available_segments.extend(available);
        file.available_segments
            .extend(file.loaded_segments.iter().cloned());
        file.data = data;
        file
    }
}

/// Diagnostic left in a thread record when stored data failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Everything cached for one thread
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadCache {
    files: Vec<CachedFile>,
    pub compatibility_metadata: Option<CompatibilityMetadata>,
    /// Normalized queries, most recent first
    pub previous_queries: Vec<String>,
    /// Queries as typed, most recent first
    pub raw_queries: Vec<String>,
    pub is_follow_up: Option<bool>,
    pub last_query_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub cache_errors: Vec<CacheErrorEntry>,
    /// Unrecognized metadata fields, kept as found
    pub extra_metadata: serde_json::Map<String, Value>,
}

impl Default for ThreadCache {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            compatibility_metadata: None,
            previous_queries: Vec::new(),
            raw_queries: Vec::new(),
            is_follow_up: None,
            last_query_time: None,
            last_updated: Utc::now(),
            cache_errors: Vec::new(),
            extra_metadata: serde_json::Map::new(),
        }
    }
}

impl ThreadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[CachedFile] {
        &self.files
    }

    pub fn file(&self, file_id: &str) -> Option<&CachedFile> {
        let file_id = normalize_file_id(file_id);
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    /// Add a file, or merge it into the entry with the same id
    pub fn upsert_file(&mut self, incoming: &CachedFile) {
        match self.files.iter_mut().find(|f| f.id == incoming.id) {
            Some(existing) => existing.merge_from(incoming),
            None => self.files.push(incoming.clone()),
        }
    }

    /// Keep only the files matching `keep`
    pub(crate) fn retain_files(&mut self, keep: impl FnMut(&CachedFile) -> bool) {
        self.files.retain(keep);
    }

    /// Append a validation diagnostic
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.cache_errors.push(CacheErrorEntry {
            timestamp: Utc::now(),
            error: error.into(),
        });
    }
}

/// Conversation history stored with a thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadContext {
    pub previous_queries: Vec<String>,
    pub raw_queries: Vec<String>,
    pub is_follow_up: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_query_time: Option<DateTime<Utc>>,
}

/// Partial update of the conversation history
///
/// Queries are prepended to the stored history. Fields left empty or
/// `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextUpdate {
    /// New normalized queries, most recent first
    pub previous_queries: Vec<String>,
    /// New raw queries, most recent first
    pub raw_queries: Vec<String>,
    pub is_follow_up: Option<bool>,
    pub last_query_time: Option<DateTime<Utc>>,
}

impl ContextUpdate {
    /// Record one query asked now
    pub fn query(normalized: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            previous_queries: vec![normalized.into()],
            raw_queries: vec![raw.into()],
            is_follow_up: None,
            last_query_time: Some(Utc::now()),
        }
    }

    pub fn follow_up(mut self, is_follow_up: bool) -> Self {
        self.is_follow_up = Some(is_follow_up);
        self
    }
}

/// Overview of a thread's cached state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCacheSummary {
    pub thread_id: String,
    pub file_ids: Vec<String>,
    /// Loaded segments per file
    pub loaded_segments: BTreeMap<String, BTreeSet<String>>,
    pub history_length: usize,
    pub has_compatibility_metadata: bool,
    pub is_fully_compatible: Option<bool>,
    pub mapping_version: Option<String>,
    pub cache_error_count: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}
