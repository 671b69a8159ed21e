//! Gate decisions

use crate::compat::FileMetadata;
use serde::{Deserialize, Serialize};

/// How a request may continue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Run the query as asked
    Proceed,
    /// Stop and show the message to the user
    Blocked,
    /// Run with the comparable subset and pass the message on as context
    DegradedProceed,
}

/// Why stored compatibility metadata was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    Comparison,
    NewTopic,
}

/// Result of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub outcome: GateOutcome,
    /// Files the request may use
    pub file_ids: Vec<String>,
    /// Files that must not be compared across years
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_file_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_comparison: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetReason>,
    /// Files looked up again after a reset
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_metadata: Vec<FileMetadata>,
}

/// Payload returned to the user when a comparison is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatibleComparison {
    pub incompatible_comparison: bool,
    pub message: String,
}

impl GateDecision {
    pub fn proceed(file_ids: Vec<String>, is_comparison: bool) -> Self {
        Self {
            outcome: GateOutcome::Proceed,
            file_ids,
            excluded_file_ids: Vec::new(),
            message: None,
            is_comparison,
            reset: None,
            file_metadata: Vec::new(),
        }
    }

    pub fn blocked(message: impl Into<String>, excluded_file_ids: Vec<String>) -> Self {
        Self {
            outcome: GateOutcome::Blocked,
            file_ids: Vec::new(),
            excluded_file_ids,
            message: Some(message.into()),
            is_comparison: true,
            reset: None,
            file_metadata: Vec::new(),
        }
    }

    pub fn degraded(
        file_ids: Vec<String>,
        excluded_file_ids: Vec<String>,
        advisory: impl Into<String>,
    ) -> Self {
        Self {
            outcome: GateOutcome::DegradedProceed,
            file_ids,
            excluded_file_ids,
            message: Some(advisory.into()),
            is_comparison: true,
            reset: None,
            file_metadata: Vec::new(),
        }
    }

    pub fn with_reset(mut self, reset: Option<ResetReason>) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_file_metadata(mut self, file_metadata: Vec<FileMetadata>) -> Self {
        self.file_metadata = file_metadata;
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.outcome == GateOutcome::Blocked
    }

    /// User-facing payload for a blocked comparison
    pub fn incompatible_comparison(&self) -> Option<IncompatibleComparison> {
        if !self.is_blocked() {
            return None;
        }
        Some(IncompatibleComparison {
            incompatible_comparison: true,
            message: self.message.clone().unwrap_or_default(),
        })
    }
}
