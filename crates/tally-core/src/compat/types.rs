//! Compatibility data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Topic assigned to files the mapping does not know
pub const UNKNOWN_TOPIC: &str = "Unknown";

/// A file id resolved against the topic mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_id: String,
    pub topic_id: String,
    /// Survey year taken from the file id, when it carries one
    pub year: Option<u16>,
    pub comparable: bool,
    pub user_message: Option<String>,
}

/// Partition of a candidate file set for a cross-year comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparablePairs {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    /// Message of the first invalid topic
    pub message: Option<String>,
}

impl ComparablePairs {
    /// Nothing may be compared
    pub fn is_blocked(&self) -> bool {
        !self.invalid.is_empty() && self.valid.is_empty()
    }

    /// Some files must be dropped but others remain usable
    pub fn is_partial(&self) -> bool {
        !self.invalid.is_empty() && !self.valid.is_empty()
    }
}

/// Per-topic digest of a file set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicFileSummary {
    pub years: BTreeSet<u16>,
    pub comparable: bool,
    pub user_message: Option<String>,
    pub file_ids: Vec<String>,
}

/// Comparability of a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCompatibility {
    pub file_id: String,
    pub topic_id: Option<String>,
    pub comparable: bool,
    pub user_message: String,
}

/// Result of dropping non-comparable topics from a comparison request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredFiles {
    pub file_ids: Vec<String>,
    /// Topic → explanation for every topic that was removed
    pub incomparable_topic_messages: BTreeMap<String, String>,
}

/// Comparability of a topic across survey years
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCompatibility {
    pub comparable: bool,
    #[serde(default)]
    pub available_years: BTreeSet<String>,
    /// Empty unless the topic is comparable
    #[serde(default)]
    pub available_markets: BTreeSet<String>,
    #[serde(default)]
    pub user_message: String,
}

/// Comparability of a demographic segment across survey years
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCompatibility {
    pub comparable: bool,
    #[serde(default)]
    pub comparable_values: Vec<String>,
    #[serde(default)]
    pub user_message: String,
}

/// Why an assessment could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Point-in-time compatibility assessment attached to a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityMetadata {
    pub is_fully_compatible: bool,
    #[serde(default)]
    pub topic_compatibility: BTreeMap<String, TopicCompatibility>,
    #[serde(default)]
    pub segment_compatibility: BTreeMap<String, SegmentCompatibility>,
    pub mapping_version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub assessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AssessmentError>,
}

impl CompatibilityMetadata {
    /// Empty, fully compatible assessment stamped now
    pub fn new(mapping_version: impl Into<String>) -> Self {
        Self {
            is_fully_compatible: true,
            topic_compatibility: BTreeMap::new(),
            segment_compatibility: BTreeMap::new(),
            mapping_version: mapping_version.into(),
            assessed_at: Utc::now(),
            error: None,
        }
    }

    /// Assessment that could not be carried out
    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            is_fully_compatible: false,
            mapping_version: "unknown".to_string(),
            error: Some(AssessmentError {
                kind: "TECHNICAL".to_string(),
                message: "Unable to assess compatibility due to a technical issue".to_string(),
                details: Some(details.into()),
            }),
            ..Self::new("unknown")
        }
    }

    /// Whether this assessment may still be trusted
    ///
    /// Stale when produced by another mapping version or older than `window`.
    pub fn is_fresh(&self, current_version: &str, window: Duration, now: DateTime<Utc>) -> bool {
        if self.mapping_version != current_version {
            return false;
        }
        match chrono::Duration::from_std(window) {
            Ok(window) => now - self.assessed_at <= window,
            Err(_) => true,
        }
    }

    /// Topics that cannot be compared although data exists for several years
    pub fn blocked_topics(&self) -> Vec<(&str, &TopicCompatibility)> {
        self.topic_compatibility
            .iter()
            .filter(|(_, info)| !info.comparable && info.available_years.len() > 1)
            .map(|(topic, info)| (topic.as_str(), info))
            .collect()
    }
}
