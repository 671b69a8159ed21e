//! Topic compatibility index

use super::artifact::{GlobalFileEntry, TopicMappingArtifact};
use super::types::{
    ComparablePairs, CompatibilityMetadata, FileCompatibility, FileMetadata, FilteredFiles,
    SegmentCompatibility, TopicCompatibility, TopicFileSummary, UNKNOWN_TOPIC,
};
use crate::error::{TallyError, TallyResult};
use crate::file_id::{FileId, normalize_file_id};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const UNKNOWN_FILE_MESSAGE: &str = "No compatibility information available for this file.";
const UNMAPPED_FILE_MESSAGE: &str =
    "File not found in compatibility mapping. Treating as non-comparable for safety.";
const UNMAPPED_TOPIC_MESSAGE: &str = "This topic is not available in the canonical mapping.";
const COMPARABLE_MESSAGE: &str = "Data can be compared across years.";
const NOT_COMPARABLE_MESSAGE: &str = "Year-on-year comparisons not available for this topic.";
const FORCED_MESSAGE: &str = "The wording of this question changed between survey years, \
     so year-on-year comparisons are not available for this topic.";
const FILTERED_TOPIC_MESSAGE: &str = "This topic cannot be compared across years.";

/// Segments read from within a single data file and comparable across years
const DEMOGRAPHIC_SEGMENTS: &[&str] = &[
    "age",
    "gender",
    "sector",
    "org_size",
    "job_level",
    "relationship_status",
    "education",
    "generation",
    "employment_status",
];

#[derive(Debug, Clone)]
struct IndexedFile {
    topic_id: String,
    question: Option<String>,
}

/// Read-only view of the canonical topic mapping
///
/// Built once per process; every query against it is pure.
#[derive(Debug, Clone)]
pub struct CompatibilityIndex {
    version: String,
    topics: BTreeMap<String, TopicCompatibility>,
    topic_order: Vec<String>,
    topic_files: BTreeMap<String, Vec<String>>,
    files: HashMap<String, IndexedFile>,
    global_files: BTreeMap<String, GlobalFileEntry>,
    comparable_markets: Vec<String>,
    forced_questions: BTreeSet<String>,
}

impl CompatibilityIndex {
    /// Build the index, forcing topics containing any of `forced_questions`
    /// to be non-comparable
    pub fn from_artifact(artifact: &TopicMappingArtifact, forced_questions: &[String]) -> Self {
        let forced: BTreeSet<String> = forced_questions
            .iter()
            .map(|q| q.trim_start_matches(['Q', 'q']).to_string())
            .collect();

        let mut topics = BTreeMap::new();
        let mut topic_order = Vec::new();
        let mut topic_files: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut files = HashMap::new();

        for theme in &artifact.themes {
            for topic in &theme.topics {
                if topics.contains_key(&topic.id) {
                    tracing::warn!("duplicate topic {} in mapping, keeping first", topic.id);
                    continue;
                }

                let mut available_years = BTreeSet::new();
                let mut forced_topic = false;

                for (year, entries) in &topic.mapping {
                    if entries.is_empty() {
                        continue;
                    }
                    available_years.insert(year.clone());
                    for entry in entries {
                        let question = entry.question_id(year);
                        if question.as_ref().is_some_and(|q| forced.contains(q)) {
                            forced_topic = true;
                        }
                        let Some(file_id) = entry.file_id(year) else {
                            continue;
                        };
                        if files.contains_key(&file_id) {
                            tracing::warn!(
                                "file {} mapped to more than one topic, keeping first",
                                file_id
                            );
                            continue;
                        }
                        topic_files
                            .entry(topic.id.clone())
                            .or_default()
                            .push(file_id.clone());
                        files.insert(
                            file_id,
                            IndexedFile {
                                topic_id: topic.id.clone(),
                                question,
                            },
                        );
                    }
                }

                let comparable = topic.comparable && !forced_topic;
                if forced_topic && topic.comparable {
                    tracing::debug!(
                        "topic {} forced non-comparable by question override",
                        topic.id
                    );
                }
                let user_message = match &topic.user_message {
                    Some(message) if !message.is_empty() => message.clone(),
                    _ if forced_topic => FORCED_MESSAGE.to_string(),
                    _ if comparable => COMPARABLE_MESSAGE.to_string(),
                    _ => NOT_COMPARABLE_MESSAGE.to_string(),
                };
                let available_markets = if comparable {
                    topic.available_markets.iter().cloned().collect()
                } else {
                    BTreeSet::new()
                };

                topic_order.push(topic.id.clone());
                topics.insert(
                    topic.id.clone(),
                    TopicCompatibility {
                        comparable,
                        available_years,
                        available_markets,
                        user_message,
                    },
                );
            }
        }

        tracing::info!(
            "compatibility index v{} built: {} topics, {} files",
            artifact.version(),
            topics.len(),
            files.len()
        );

        Self {
            version: artifact.version().to_string(),
            topics,
            topic_order,
            topic_files,
            files,
            global_files: artifact.global_files.clone(),
            comparable_markets: artifact.data_access.comparable_markets.clone(),
            forced_questions: forced,
        }
    }

    /// Parse and index a mapping from JSON text
    pub fn from_json(content: &str, forced_questions: &[String]) -> TallyResult<Self> {
        let artifact = TopicMappingArtifact::from_json(content)?;
        Ok(Self::from_artifact(&artifact, forced_questions))
    }

    /// Load and index a mapping file
    pub fn load(path: &Path, forced_questions: &[String]) -> TallyResult<Self> {
        let artifact = TopicMappingArtifact::load(path)?;
        if artifact.themes.is_empty() {
            return Err(TallyError::compatibility(format!(
                "Topic mapping at '{}' contains no themes",
                path.display()
            )));
        }
        Ok(Self::from_artifact(&artifact, forced_questions))
    }

    /// Version tag of the mapping this index was built from
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Compatibility of a known topic
    pub fn topic_compatibility(&self, topic_id: &str) -> Option<&TopicCompatibility> {
        self.topics.get(topic_id)
    }

    /// Whether `file_id`'s question is covered by the forced override
    fn is_forced(&self, file_id: &str, indexed: Option<&IndexedFile>) -> bool {
        let question = indexed
            .and_then(|f| f.question.clone())
            .or_else(|| FileId::parse(file_id).map(|id| id.question));
        question.is_some_and(|q| self.forced_questions.contains(q.trim_start_matches(['Q', 'q'])))
    }

    /// Resolve file ids to their topics
    ///
    /// Unknown ids are never treated as comparable.
    pub fn lookup_files<S: AsRef<str>>(&self, file_ids: &[S]) -> Vec<FileMetadata> {
        file_ids
            .iter()
            .map(|raw| {
                let file_id = normalize_file_id(raw.as_ref()).to_string();
                let year = FileId::year_of(&file_id);
                let indexed = self.files.get(&file_id);

                match indexed.and_then(|f| self.topics.get(&f.topic_id).map(|t| (f, t))) {
                    Some((entry, topic)) => FileMetadata {
                        comparable: topic.comparable && !self.is_forced(&file_id, Some(entry)),
                        topic_id: entry.topic_id.clone(),
                        user_message: Some(topic.user_message.clone()),
                        file_id,
                        year,
                    },
                    None => {
                        tracing::debug!("file {} not in compatibility mapping", file_id);
                        FileMetadata {
                            file_id,
                            topic_id: UNKNOWN_TOPIC.to_string(),
                            year,
                            comparable: false,
                            user_message: Some(UNKNOWN_FILE_MESSAGE.to_string()),
                        }
                    }
                }
            })
            .collect()
    }

    /// Split files into those usable for a cross-year comparison and those that are not
    ///
    /// A non-comparable file is invalid when its topic group mixes years or
    /// its topic has data for more than one year. A dated file outside the
    /// mapping is always invalid. Topics are visited in order of first
    /// appearance, so `message` is deterministic.
    pub fn get_comparable_pairs(&self, files: &[FileMetadata]) -> ComparablePairs {
        let mut result = ComparablePairs::default();

        for (topic_id, group) in group_by_topic(files) {
            let years: BTreeSet<u16> = group.iter().filter_map(|f| f.year).collect();
            let multi_year_topic = self
                .topics
                .get(topic_id)
                .is_some_and(|t| t.available_years.len() > 1);
            let year_mix_disallowed = years.len() > 1 || multi_year_topic;
            let unknown_topic = topic_id == UNKNOWN_TOPIC;

            for file in group {
                let unknown_dated = unknown_topic && file.year.is_some();
                if !file.comparable && (year_mix_disallowed || unknown_dated) {
                    if result.message.is_none() {
                        result.message = file.user_message.clone().or_else(|| {
                            self.topics.get(topic_id).map(|t| t.user_message.clone())
                        });
                    }
                    result.invalid.push(file.file_id.clone());
                } else {
                    result.valid.push(file.file_id.clone());
                }
            }
        }

        result
    }

    /// Years, comparability and files per topic
    pub fn summarize_topic_files(&self, files: &[FileMetadata]) -> BTreeMap<String, TopicFileSummary> {
        let mut summary: BTreeMap<String, TopicFileSummary> = BTreeMap::new();
        for file in files {
            let entry = summary
                .entry(file.topic_id.clone())
                .or_insert_with(|| TopicFileSummary {
                    years: BTreeSet::new(),
                    comparable: true,
                    user_message: file.user_message.clone(),
                    file_ids: Vec::new(),
                });
            if let Some(year) = file.year {
                entry.years.insert(year);
            }
            entry.comparable &= file.comparable;
            entry.file_ids.push(file.file_id.clone());
        }
        summary
    }

    /// Comparability of a single file, including files outside any topic
    pub fn file_compatibility(&self, file_id: &str) -> FileCompatibility {
        let file_id = normalize_file_id(file_id).to_string();

        if let Some(global) = self.global_files.get(&file_id) {
            return FileCompatibility {
                file_id,
                topic_id: None,
                comparable: global.comparable,
                user_message: global.description.clone(),
            };
        }

        let metadata = self.lookup_files(&[file_id.as_str()]);
        match metadata.into_iter().next() {
            Some(meta) if meta.topic_id != UNKNOWN_TOPIC => FileCompatibility {
                file_id: meta.file_id,
                topic_id: Some(meta.topic_id),
                comparable: meta.comparable,
                user_message: meta.user_message.unwrap_or_default(),
            },
            _ => FileCompatibility {
                file_id,
                topic_id: None,
                comparable: false,
                user_message: UNMAPPED_FILE_MESSAGE.to_string(),
            },
        }
    }

    /// Explanation for a non-comparable topic; `None` when it is comparable
    pub fn incomparable_topic_message(&self, topic_id: &str) -> Option<&str> {
        match self.topics.get(topic_id) {
            Some(topic) if topic.comparable => None,
            Some(topic) => Some(topic.user_message.as_str()),
            None => Some(UNMAPPED_TOPIC_MESSAGE),
        }
    }

    /// Whether every topic represented by more than one file is comparable
    pub fn are_files_comparable<S: AsRef<str>>(&self, file_ids: &[S]) -> bool {
        if file_ids.len() <= 1 {
            return true;
        }
        let files = self.lookup_files(file_ids);
        group_by_topic(&files)
            .into_iter()
            .all(|(_, group)| group.len() < 2 || group.iter().all(|f| f.comparable))
    }

    /// Drop topics that cannot be compared from a comparison request
    ///
    /// Only topics represented by several files are removed. Outside a
    /// comparison the ids pass through untouched.
    pub fn filter_incomparable_files<S: AsRef<str>>(
        &self,
        file_ids: &[S],
        is_comparison: bool,
    ) -> FilteredFiles {
        if !is_comparison || file_ids.is_empty() {
            return FilteredFiles {
                file_ids: file_ids
                    .iter()
                    .map(|id| normalize_file_id(id.as_ref()).to_string())
                    .collect(),
                incomparable_topic_messages: BTreeMap::new(),
            };
        }

        let files = self.lookup_files(file_ids);
        let mut result = FilteredFiles::default();

        for (topic_id, group) in group_by_topic(&files) {
            let comparable = group.iter().all(|f| f.comparable);
            if group.len() > 1 && !comparable {
                let message = match self.topics.get(topic_id) {
                    Some(topic) if !topic.user_message.is_empty() => topic.user_message.clone(),
                    _ => FILTERED_TOPIC_MESSAGE.to_string(),
                };
                tracing::info!(
                    "filtered {} files for incomparable topic {}",
                    group.len(),
                    topic_id
                );
                result
                    .incomparable_topic_messages
                    .insert(topic_id.to_string(), message);
            } else {
                result
                    .file_ids
                    .extend(group.iter().map(|f| f.file_id.clone()));
            }
        }

        result
    }

    /// Topics marked comparable, in mapping order
    pub fn compatible_topics(&self) -> Vec<&str> {
        self.topics_where(|t| t.comparable)
    }

    /// Topics marked non-comparable, in mapping order
    pub fn non_comparable_topics(&self) -> Vec<&str> {
        self.topics_where(|t| !t.comparable)
    }

    fn topics_where(&self, predicate: impl Fn(&TopicCompatibility) -> bool) -> Vec<&str> {
        self.topic_order
            .iter()
            .filter(|id| self.topics.get(*id).is_some_and(&predicate))
            .map(String::as_str)
            .collect()
    }

    /// Every file mapped to a topic
    pub fn file_ids_for_topic(&self, topic_id: &str) -> &[String] {
        self.topic_files
            .get(topic_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Distinct known topics of a set of files, in order of first appearance
    pub fn topics_for_files<S: AsRef<str>>(&self, file_ids: &[S]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.lookup_files(file_ids)
            .into_iter()
            .filter(|f| f.topic_id != UNKNOWN_TOPIC)
            .filter_map(|f| seen.insert(f.topic_id.clone()).then_some(f.topic_id))
            .collect()
    }

    /// Produce a compatibility assessment for a set of topics and segments
    pub fn assess<S: AsRef<str>, G: AsRef<str>>(
        &self,
        topics: &[S],
        segments: &[G],
    ) -> CompatibilityMetadata {
        let mut metadata = CompatibilityMetadata::new(self.version.clone());

        for topic_id in topics {
            let topic_id = topic_id.as_ref();
            match self.topics.get(topic_id) {
                Some(topic) => {
                    if !topic.comparable && topic.available_years.len() > 1 {
                        metadata.is_fully_compatible = false;
                    }
                    metadata
                        .topic_compatibility
                        .insert(topic_id.to_string(), topic.clone());
                }
                None => {
                    metadata.is_fully_compatible = false;
                    metadata.topic_compatibility.insert(
                        topic_id.to_string(),
                        TopicCompatibility {
                            comparable: false,
                            available_years: BTreeSet::new(),
                            available_markets: BTreeSet::new(),
                            user_message: UNMAPPED_TOPIC_MESSAGE.to_string(),
                        },
                    );
                }
            }
        }

        for segment in segments {
            let segment = segment.as_ref();
            let compatibility = self.segment_compatibility(segment);
            if segment == "country" && !compatibility.comparable {
                metadata.is_fully_compatible = false;
            }
            metadata
                .segment_compatibility
                .insert(segment.to_string(), compatibility);
        }

        metadata
    }

    fn segment_compatibility(&self, segment: &str) -> SegmentCompatibility {
        if segment == "country" {
            let markets = self.comparable_markets.clone();
            let comparable = !markets.is_empty();
            let user_message = if comparable {
                format!(
                    "Country data can be compared across years for these markets: {}",
                    markets.join(", ")
                )
            } else {
                "No comparable country data available across years.".to_string()
            };
            return SegmentCompatibility {
                comparable,
                comparable_values: markets,
                user_message,
            };
        }

        let user_message = if DEMOGRAPHIC_SEGMENTS.contains(&segment) {
            format!(
                "{} data is available for analysis and can typically be compared across years.",
                segment
            )
        } else {
            format!(
                "{} data is available, but cross-year comparisons should be made with caution.",
                segment
            )
        };
        SegmentCompatibility {
            comparable: true,
            comparable_values: Vec::new(),
            user_message,
        }
    }
}

/// Group files by topic, preserving the order in which topics first appear
fn group_by_topic(files: &[FileMetadata]) -> Vec<(&str, Vec<&FileMetadata>)> {
    let mut groups: Vec<(&str, Vec<&FileMetadata>)> = Vec::new();
    for file in files {
        match groups.iter_mut().find(|(topic, _)| *topic == file.topic_id) {
            Some((_, group)) => group.push(file),
            None => groups.push((file.topic_id.as_str(), vec![file])),
        }
    }
    groups
}

/// Loads the index from disk on first use and keeps it for the process lifetime
#[derive(Debug)]
pub struct IndexLoader {
    path: PathBuf,
    forced_questions: Vec<String>,
    loaded: RwLock<Option<Arc<CompatibilityIndex>>>,
}

impl IndexLoader {
    pub fn new(path: impl Into<PathBuf>, forced_questions: Vec<String>) -> Self {
        Self {
            path: path.into(),
            forced_questions,
            loaded: RwLock::new(None),
        }
    }

    /// The index, loading it if this is the first call
    pub fn get(&self) -> TallyResult<Arc<CompatibilityIndex>> {
        if let Some(index) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.loaded.write();
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(CompatibilityIndex::load(&self.path, &self.forced_questions)?);
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Assess with the loaded index, or report why it could not be loaded
    pub fn assess<S: AsRef<str>, G: AsRef<str>>(
        &self,
        topics: &[S],
        segments: &[G],
    ) -> CompatibilityMetadata {
        match self.get() {
            Ok(index) => index.assess(topics, segments),
            Err(e) => {
                tracing::error!("compatibility assessment failed: {}", e);
                CompatibilityMetadata::failed(e.to_string())
            }
        }
    }
}
