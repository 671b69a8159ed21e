//! Turn inputs and results

use crate::compat::CompatibilityMetadata;
use crate::gate::{GateDecision, IncompatibleComparison};
use crate::thread::CachedFile;

/// Segment loaded when a request names none
pub const DEFAULT_SEGMENT: &str = "overall";

/// One user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub query: String,
    pub thread_id: Option<String>,
    /// Segments to load; the identifier's choice or the default when empty
    pub segments: Vec<String>,
}

impl TurnRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            thread_id: None,
            segments: Vec::new(),
        }
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments = segments.into_iter().map(Into::into).collect();
        self
    }
}

/// Data produced for a turn
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedQueryResult {
    /// Nothing relevant was found
    Empty { reason: String },
    /// A collaborator failed
    Error { message: String },
    /// Files with their loaded segments
    Data { files: Vec<CachedFile> },
}

impl ProcessedQueryResult {
    pub fn empty(reason: impl Into<String>) -> Self {
        Self::Empty {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    pub fn files(&self) -> &[CachedFile] {
        match self {
            Self::Data { files } => files,
            _ => &[],
        }
    }
}

/// A turn that was allowed to run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedQuery {
    pub result: ProcessedQueryResult,
    pub decision: GateDecision,
    /// Assessment stored with the thread for this turn
    pub compatibility: Option<CompatibilityMetadata>,
    /// Text to pass to answer generation alongside the data
    pub advisory: Option<String>,
    pub is_follow_up: bool,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// An incompatible comparison; return the payload to the user as is
    Blocked(IncompatibleComparison),
    Processed(Box<ProcessedQuery>),
}

impl TurnOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    pub fn processed(&self) -> Option<&ProcessedQuery> {
        match self {
            Self::Processed(query) => Some(query),
            Self::Blocked(_) => None,
        }
    }
}
