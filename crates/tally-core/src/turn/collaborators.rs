//! External collaborators of a turn

use crate::error::TallyResult;
use crate::thread::CachedFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the file identifier is asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    pub query: String,
    pub previous_query: Option<String>,
    pub is_follow_up: bool,
}

/// Files and segments judged relevant to a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdentification {
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub matched_topics: Vec<String>,
}

/// Picks the dataset files relevant to a query
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileIdentifier: Send + Sync {
    async fn identify(&self, request: &IdentifyRequest) -> TallyResult<FileIdentification>;
}

/// Loads segment payloads for a dataset file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentLoader: Send + Sync {
    /// Load `segments` of `file_id`
    ///
    /// The returned file holds the loaded payloads and may declare further
    /// available segments.
    async fn load(&self, file_id: &str, segments: &[String]) -> TallyResult<CachedFile>;
}
