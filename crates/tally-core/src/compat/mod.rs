//! Cross-year compatibility
//!
//! The canonical topic mapping groups survey files into topics and marks
//! each topic as comparable (or not) across survey years. The
//! `CompatibilityIndex` built from it answers which files belong to which
//! topic, whether a set of files may be compared, and produces the
//! `CompatibilityMetadata` snapshot stored with each thread.

mod advisory;
mod artifact;
mod index;
mod types;

pub use advisory::{format_degraded_advisory, format_incompatibility_advisory};
pub use artifact::{MappedFile, TopicEntry, TopicMappingArtifact};
pub use index::{CompatibilityIndex, IndexLoader};
pub use types::{
    AssessmentError, ComparablePairs, CompatibilityMetadata, FileCompatibility, FileMetadata,
    FilteredFiles, SegmentCompatibility, TopicCompatibility, TopicFileSummary, UNKNOWN_TOPIC,
};
