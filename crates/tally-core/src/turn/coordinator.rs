//! One query turn against a thread's cache

use super::collaborators::{FileIdentification, FileIdentifier, IdentifyRequest, SegmentLoader};
use super::types::{
    DEFAULT_SEGMENT, ProcessedQuery, ProcessedQueryResult, TurnOutcome, TurnRequest,
};
use crate::compat::{CompatibilityMetadata, format_incompatibility_advisory};
use crate::config::GateConfig;
use crate::file_id::FileId;
use crate::gate::{
    CompatibilityGate, CompatibilitySource, GateDecision, is_comparison_query, is_new_topic,
    mentioned_years, mentions_relative_year, normalize_query,
};
use crate::thread::{CachedFile, ContextUpdate, ThreadCacheManager, ThreadContext};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs a query through identification, the gate, loading and caching
///
/// A blocked comparison ends the turn before any data is loaded. Every
/// other turn records the query in the thread's history, and a turn that
/// loaded data writes it back before returning.
#[derive(Clone)]
pub struct TurnCoordinator {
    threads: ThreadCacheManager,
    gate: CompatibilityGate,
    source: Arc<dyn CompatibilitySource>,
    identifier: Arc<dyn FileIdentifier>,
    loader: Arc<dyn SegmentLoader>,
}

impl std::fmt::Debug for TurnCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnCoordinator")
            .field("threads", &self.threads)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl TurnCoordinator {
    pub fn new(
        source: Arc<dyn CompatibilitySource>,
        threads: ThreadCacheManager,
        identifier: Arc<dyn FileIdentifier>,
        loader: Arc<dyn SegmentLoader>,
    ) -> Self {
        let gate = CompatibilityGate::new(source.clone(), threads.clone());
        Self {
            threads,
            gate,
            source,
            identifier,
            loader,
        }
    }

    pub fn with_gate_config(mut self, config: GateConfig) -> Self {
        self.gate = self.gate.with_config(config);
        self
    }

    pub fn threads(&self) -> &ThreadCacheManager {
        &self.threads
    }

    pub fn gate(&self) -> &CompatibilityGate {
        &self.gate
    }

    pub async fn run(&self, request: &TurnRequest) -> TurnOutcome {
        let normalized = normalize_query(&request.query);
        let thread_id = request.thread_id.as_deref();
        let (context, cached) = match thread_id {
            Some(id) => (
                self.threads.get_context(id).await,
                self.threads.get_cached_files(id).await,
            ),
            None => (ThreadContext::default(), Vec::new()),
        };

        let is_comparison = is_comparison_query(&normalized);
        let is_follow_up = self.is_follow_up(&normalized, &context, &cached);
        debug!(
            "turn: comparison={}, follow_up={}, {} cached files",
            is_comparison,
            is_follow_up,
            cached.len()
        );

        // Comparisons always look for the other year's files
        let reuse_cache = is_follow_up && !is_comparison && covers_named_years(&normalized, &cached);
        let identified = if reuse_cache {
            FileIdentification {
                file_ids: cached.iter().map(|f| f.id().to_string()).collect(),
                ..Default::default()
            }
        } else {
            let identify = IdentifyRequest {
                query: normalized.clone(),
                previous_query: context.previous_queries.first().cloned(),
                is_follow_up,
            };
            match self.identifier.identify(&identify).await {
                Ok(found) => found,
                Err(e) => {
                    error!("file identification failed: {}", e);
                    self.record_query(thread_id, &normalized, &request.query, is_follow_up)
                        .await;
                    return processed(
                        ProcessedQueryResult::error(format!("File identification failed: {}", e)),
                        GateDecision::proceed(Vec::new(), is_comparison),
                        None,
                        is_follow_up,
                    );
                }
            }
        };

        let file_ids = if is_comparison {
            identified.file_ids
        } else {
            years_of_interest(&normalized, identified.file_ids)
        };

        let decision = self.gate.evaluate(&request.query, thread_id, &file_ids).await;
        if let Some(payload) = decision.incompatible_comparison() {
            info!("blocked incompatible comparison: {}", payload.message);
            self.record_query(thread_id, &normalized, &request.query, is_follow_up)
                .await;
            return TurnOutcome::Blocked(payload);
        }

        if decision.file_ids.is_empty() {
            self.record_query(thread_id, &normalized, &request.query, is_follow_up)
                .await;
            return processed(
                ProcessedQueryResult::empty("No relevant data files were found for this query"),
                decision,
                None,
                is_follow_up,
            );
        }

        let segments = requested_segments(&request.segments, &identified.segments);
        let cached_by_id: HashMap<&str, &CachedFile> =
            cached.iter().map(|f| (f.id(), f)).collect();

        let mut files = Vec::with_capacity(decision.file_ids.len());
        let mut loaded = Vec::new();
        let mut failures = Vec::new();
        for file_id in &decision.file_ids {
            let mut file = cached_by_id
                .get(file_id.as_str())
                .map(|f| (*f).clone())
                .unwrap_or_else(|| CachedFile::new(file_id));
            let missing = file.missing_segments(&segments);
            if missing.is_empty() {
                debug!("all requested segments of {} are cached", file_id);
                files.push(file);
                continue;
            }

            match self.loader.load(file_id, &missing).await {
                Ok(incoming) => {
                    file.merge_from(&incoming);
                    loaded.push(file.clone());
                    files.push(file);
                }
                Err(e) => {
                    warn!("failed to load {:?} of {}: {}", missing, file_id, e);
                    failures.push(format!("{}: {}", file_id, e));
                    if !file.data().is_empty() {
                        files.push(file);
                    }
                }
            }
        }

        if files.is_empty() {
            self.record_query(thread_id, &normalized, &request.query, is_follow_up)
                .await;
            return processed(
                ProcessedQueryResult::error(format!(
                    "Failed to load data: {}",
                    failures.join("; ")
                )),
                decision,
                None,
                is_follow_up,
            );
        }

        let has_new_files = loaded
            .iter()
            .any(|f| !cached_by_id.contains_key(f.id()));
        let compatibility = self
            .assessment(thread_id, &decision.file_ids, &segments, has_new_files)
            .await;

        if let Some(thread_id) = thread_id {
            self.threads
                .update_with_files(thread_id, &loaded, Some(compatibility.clone()))
                .await;
        }
        self.record_query(thread_id, &normalized, &request.query, is_follow_up)
            .await;

        let advisory = join_advisories(
            decision.message.as_deref(),
            format_incompatibility_advisory(&compatibility).as_deref(),
        );
        info!(
            "turn processed {} files ({} loaded, {} failed)",
            files.len(),
            loaded.len(),
            failures.len()
        );
        TurnOutcome::Processed(Box::new(ProcessedQuery {
            result: ProcessedQueryResult::Data { files },
            decision,
            compatibility: Some(compatibility),
            advisory,
            is_follow_up,
        }))
    }

    /// A query continues the thread when it has cached data and history
    /// and stays on the previous query's topic
    fn is_follow_up(&self, normalized: &str, context: &ThreadContext, cached: &[CachedFile]) -> bool {
        let Some(previous) = context.previous_queries.first() else {
            return false;
        };
        if cached.is_empty() {
            return false;
        }
        let config = self.gate.config();
        !is_new_topic(
            normalized,
            previous,
            config.new_topic_threshold,
            config.min_word_length,
        )
    }

    /// Stored metadata when still trustworthy and nothing new was loaded,
    /// a fresh assessment otherwise
    async fn assessment(
        &self,
        thread_id: Option<&str>,
        file_ids: &[String],
        segments: &[String],
        has_new_files: bool,
    ) -> CompatibilityMetadata {
        if !has_new_files {
            if let Some(stored) = self.trusted_metadata(thread_id).await {
                debug!("reusing stored compatibility metadata");
                return stored;
            }
        }

        let topics = match self.source.topics_for_files(file_ids).await {
            Ok(topics) => topics,
            Err(e) => {
                warn!("failed to resolve topics for assessment: {}", e);
                return CompatibilityMetadata::failed(e.to_string());
            }
        };
        match self.source.assess(&topics, segments).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("compatibility assessment failed: {}", e);
                CompatibilityMetadata::failed(e.to_string())
            }
        }
    }

    async fn trusted_metadata(&self, thread_id: Option<&str>) -> Option<CompatibilityMetadata> {
        let thread_id = thread_id?;
        let version = self.source.mapping_version().await.ok()?;
        if !self
            .threads
            .is_compatibility_metadata_valid(thread_id, &version)
            .await
        {
            return None;
        }
        self.threads.get_compatibility_metadata(thread_id).await
    }

    async fn record_query(
        &self,
        thread_id: Option<&str>,
        normalized: &str,
        raw: &str,
        is_follow_up: bool,
    ) {
        let Some(thread_id) = thread_id else {
            return;
        };
        let update = ContextUpdate::query(normalized, raw).follow_up(is_follow_up);
        if !self.threads.update_context(thread_id, update).await {
            warn!("failed to record query for thread {}", thread_id);
        }
    }
}

fn processed(
    result: ProcessedQueryResult,
    decision: GateDecision,
    compatibility: Option<CompatibilityMetadata>,
    is_follow_up: bool,
) -> TurnOutcome {
    TurnOutcome::Processed(Box::new(ProcessedQuery {
        result,
        decision,
        compatibility,
        advisory: None,
        is_follow_up,
    }))
}

/// Whether every year the query names is already cached
fn covers_named_years(normalized: &str, cached: &[CachedFile]) -> bool {
    let cached_years: BTreeSet<u16> = cached.iter().filter_map(CachedFile::year).collect();
    mentioned_years(normalized).is_subset(&cached_years)
}

/// Keep the years a single-year query is about
///
/// Named years win when files exist for them, otherwise the latest year.
/// A relative year reference keeps everything.
fn years_of_interest(normalized: &str, file_ids: Vec<String>) -> Vec<String> {
    if mentions_relative_year(normalized) {
        return file_ids;
    }
    let available: BTreeSet<u16> = file_ids.iter().filter_map(|id| FileId::year_of(id)).collect();
    let named: BTreeSet<u16> = mentioned_years(normalized)
        .intersection(&available)
        .copied()
        .collect();
    let keep = if !named.is_empty() {
        named
    } else {
        match available.last() {
            Some(latest) => BTreeSet::from([*latest]),
            None => return file_ids,
        }
    };

    let before = file_ids.len();
    let kept: Vec<String> = file_ids
        .into_iter()
        .filter(|id| FileId::year_of(id).is_none_or(|year| keep.contains(&year)))
        .collect();
    if kept.len() < before {
        debug!("kept {} of {} files for years {:?}", kept.len(), before, keep);
    }
    kept
}

fn requested_segments(requested: &[String], identified: &[String]) -> Vec<String> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    if !identified.is_empty() {
        return identified.to_vec();
    }
    vec![DEFAULT_SEGMENT.to_string()]
}

fn join_advisories(gate: Option<&str>, compatibility: Option<&str>) -> Option<String> {
    match (gate, compatibility) {
        (Some(gate), Some(compatibility)) => Some(format!("{}\n\n{}", gate, compatibility)),
        (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
        (None, None) => None,
    }
}
