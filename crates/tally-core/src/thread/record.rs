//! Stored form of a thread cache
//!
//! Segment sets become arrays and timestamps become epoch milliseconds.
//! Nothing outside this module sees the stored layout.

use super::types::{CacheErrorEntry, CachedFile, ThreadCache};
use crate::compat::CompatibilityMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON value stored under `response:{thread}:meta`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_metadata: Option<CompatibilityMetadata>,
    #[serde(default)]
    pub previous_queries: Vec<String>,
    #[serde(default)]
    pub raw_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_follow_up: Option<bool>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_query_time: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now", with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_errors: Vec<CacheErrorEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub loaded_segments: Vec<String>,
    #[serde(default)]
    pub available_segments: Vec<String>,
}

impl From<FileRecord> for CachedFile {
    fn from(record: FileRecord) -> Self {
        CachedFile::from_parts(
            &record.id,
            record.data,
            record.loaded_segments,
            record.available_segments,
        )
    }
}

impl From<&CachedFile> for FileRecord {
    fn from(file: &CachedFile) -> Self {
        Self {
            id: file.id().to_string(),
            data: file.data().clone(),
            loaded_segments: file.loaded_segments().iter().cloned().collect(),
            available_segments: file.available_segments().iter().cloned().collect(),
        }
    }
}

impl From<ThreadRecord> for ThreadCache {
    fn from(record: ThreadRecord) -> Self {
        let mut cache = ThreadCache::new();
        cache.compatibility_metadata = record.compatibility_metadata;
        cache.previous_queries = record.previous_queries;
        cache.raw_queries = record.raw_queries;
        cache.is_follow_up = record.is_follow_up;
        cache.last_query_time = record.last_query_time;
        cache.last_updated = record.last_updated;
        cache.cache_errors = record.metadata.cache_errors;
        cache.extra_metadata = record.metadata.extra;
        // Duplicate ids collapse into the first entry
        for file in record.files {
            cache.upsert_file(&CachedFile::from(file));
        }
        cache
    }
}

impl From<&ThreadCache> for ThreadRecord {
    fn from(cache: &ThreadCache) -> Self {
        Self {
            files: cache.files().iter().map(FileRecord::from).collect(),
            compatibility_metadata: cache.compatibility_metadata.clone(),
            previous_queries: cache.previous_queries.clone(),
            raw_queries: cache.raw_queries.clone(),
            is_follow_up: cache.is_follow_up,
            last_query_time: cache.last_query_time,
            last_updated: cache.last_updated,
            metadata: RecordMetadata {
                cache_errors: cache.cache_errors.clone(),
                extra: cache.extra_metadata.clone(),
            },
        }
    }
}
