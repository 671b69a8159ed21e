//! Where the gate and turn coordinator get compatibility answers from

use crate::compat::{
    ComparablePairs, CompatibilityIndex, CompatibilityMetadata, FileMetadata, IndexLoader,
};
use crate::error::TallyResult;
use async_trait::async_trait;

/// Read access to a compatibility index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompatibilitySource: Send + Sync {
    /// Version of the mapping answers are based on
    async fn mapping_version(&self) -> TallyResult<String>;

    /// Resolve file ids to topics
    async fn lookup_files(&self, file_ids: &[String]) -> TallyResult<Vec<FileMetadata>>;

    /// Partition files for a cross-year comparison
    async fn comparable_pairs(&self, files: &[FileMetadata]) -> TallyResult<ComparablePairs>;

    /// Known topics of a set of files
    async fn topics_for_files(&self, file_ids: &[String]) -> TallyResult<Vec<String>>;

    /// Assess topics and segments
    async fn assess(
        &self,
        topics: &[String],
        segments: &[String],
    ) -> TallyResult<CompatibilityMetadata>;
}

#[async_trait]
impl CompatibilitySource for CompatibilityIndex {
    async fn mapping_version(&self) -> TallyResult<String> {
        Ok(self.version().to_string())
    }

    async fn lookup_files(&self, file_ids: &[String]) -> TallyResult<Vec<FileMetadata>> {
        Ok(CompatibilityIndex::lookup_files(self, file_ids))
    }

    async fn comparable_pairs(&self, files: &[FileMetadata]) -> TallyResult<ComparablePairs> {
        Ok(self.get_comparable_pairs(files))
    }

    async fn topics_for_files(&self, file_ids: &[String]) -> TallyResult<Vec<String>> {
        Ok(CompatibilityIndex::topics_for_files(self, file_ids))
    }

    async fn assess(
        &self,
        topics: &[String],
        segments: &[String],
    ) -> TallyResult<CompatibilityMetadata> {
        Ok(CompatibilityIndex::assess(self, topics, segments))
    }
}

/// Loads the mapping on first use; a load failure is returned as an error,
/// except from `assess`, which reports it inside the metadata
#[async_trait]
impl CompatibilitySource for IndexLoader {
    async fn mapping_version(&self) -> TallyResult<String> {
        Ok(self.get()?.version().to_string())
    }

    async fn lookup_files(&self, file_ids: &[String]) -> TallyResult<Vec<FileMetadata>> {
        Ok(self.get()?.lookup_files(file_ids))
    }

    async fn comparable_pairs(&self, files: &[FileMetadata]) -> TallyResult<ComparablePairs> {
        Ok(self.get()?.get_comparable_pairs(files))
    }

    async fn topics_for_files(&self, file_ids: &[String]) -> TallyResult<Vec<String>> {
        Ok(self.get()?.topics_for_files(file_ids))
    }

    async fn assess(
        &self,
        topics: &[String],
        segments: &[String],
    ) -> TallyResult<CompatibilityMetadata> {
        Ok(IndexLoader::assess(self, topics, segments))
    }
}
