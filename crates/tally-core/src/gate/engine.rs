//! Compatibility gate

use super::decision::{GateDecision, ResetReason};
use super::detect::{
    is_comparison_query, is_new_topic, mentioned_years, mentions_relative_year, normalize_query,
};
use super::source::CompatibilitySource;
use crate::compat::{ComparablePairs, FileMetadata, format_degraded_advisory};
use crate::config::GateConfig;
use crate::file_id::{FileId, normalize_file_id};
use crate::thread::{ThreadCacheManager, ThreadContext};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const DEFAULT_BLOCK_MESSAGE: &str =
    "The requested data cannot be compared across survey years.";

/// Decides whether a request may use its files for a cross-year comparison
///
/// Only an explicitly detected incompatible comparison stops a request.
/// Any failure while checking lets the request proceed.
#[derive(Clone)]
pub struct CompatibilityGate {
    source: Arc<dyn CompatibilitySource>,
    threads: ThreadCacheManager,
    config: GateConfig,
}

impl std::fmt::Debug for CompatibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityGate")
            .field("threads", &self.threads)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CompatibilityGate {
    pub fn new(source: Arc<dyn CompatibilitySource>, threads: ThreadCacheManager) -> Self {
        Self {
            source,
            threads,
            config: GateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate a query and its candidate files
    ///
    /// Cached files of the thread are checked together with the
    /// candidates. Without candidates, the cached files are the request.
    /// Pairs are only checked when the query names two years, or refers to
    /// another year without naming it while the files span two.
    pub async fn evaluate<S: AsRef<str>>(
        &self,
        query: &str,
        thread_id: Option<&str>,
        candidate_file_ids: &[S],
    ) -> GateDecision {
        let normalized = normalize_query(query);
        let is_comparison = is_comparison_query(&normalized);

        let mut cached = Vec::new();
        let mut reset = None;
        if let Some(thread_id) = thread_id {
            cached = self
                .threads
                .get_cached_files(thread_id)
                .await
                .iter()
                .map(|f| f.id().to_string())
                .collect();
            let context = self.threads.get_context(thread_id).await;
            let existing = !cached.is_empty() || !context.previous_queries.is_empty();
            if existing {
                reset = self.reset_reason(&normalized, is_comparison, &context);
            }
            if let Some(reason) = reset {
                self.threads.reset_compatibility(thread_id).await;
                info!("compatibility reset for thread {} ({:?})", thread_id, reason);
            }
        }

        let candidates = dedup(candidate_file_ids.iter().map(|id| normalize_file_id(id.as_ref())));
        let requested = if candidates.is_empty() {
            cached.clone()
        } else {
            candidates
        };
        let file_set = dedup(cached.iter().chain(&requested).map(String::as_str));

        let file_metadata = match reset {
            Some(_) => self.rederive(&file_set).await,
            None => Vec::new(),
        };

        if !is_comparison {
            return GateDecision::proceed(requested, false)
                .with_reset(reset)
                .with_file_metadata(file_metadata);
        }

        let years = mentioned_years(&normalized);
        let relative = mentions_relative_year(&normalized);
        if years.len() < 2 && !(relative && spans_years(&file_set)) {
            let narrowed = narrow_to_years(&requested, &years);
            let allowed = if years.len() == 1 && !narrowed.is_empty() {
                narrowed
            } else {
                requested
            };
            info!("comparison query within a single year, proceeding");
            return GateDecision::proceed(allowed, true)
                .with_reset(reset)
                .with_file_metadata(file_metadata);
        }

        let files = if file_metadata.is_empty() {
            self.source.lookup_files(&file_set).await
        } else {
            Ok(file_metadata.clone())
        };
        let pairs = match files {
            Ok(files) => self.source.comparable_pairs(&files).await,
            Err(e) => Err(e),
        };
        let decision = match pairs {
            Ok(pairs) => decide(pairs, requested),
            Err(e) => {
                error!("compatibility check failed, proceeding: {}", e);
                GateDecision::proceed(requested, true)
            }
        };
        info!(
            "gate decision {:?}: {} files allowed, {} excluded",
            decision.outcome,
            decision.file_ids.len(),
            decision.excluded_file_ids.len()
        );
        decision.with_reset(reset).with_file_metadata(file_metadata)
    }

    /// Look the thread's files up again after a reset
    ///
    /// A failed lookup leaves the metadata empty.
    async fn rederive(&self, file_ids: &[String]) -> Vec<FileMetadata> {
        if file_ids.is_empty() {
            return Vec::new();
        }
        match self.source.lookup_files(file_ids).await {
            Ok(files) => {
                debug!("re-derived metadata for {} files", files.len());
                files
            }
            Err(e) => {
                warn!("file lookup after compatibility reset failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Comparison wins over topic drift when both apply
    fn reset_reason(
        &self,
        normalized: &str,
        is_comparison: bool,
        context: &ThreadContext,
    ) -> Option<ResetReason> {
        if is_comparison {
            return Some(ResetReason::Comparison);
        }
        let previous = context.previous_queries.first()?;
        is_new_topic(
            normalized,
            previous,
            self.config.new_topic_threshold,
            self.config.min_word_length,
        )
        .then_some(ResetReason::NewTopic)
    }
}

/// Whether the files cover more than one year
fn spans_years(file_ids: &[String]) -> bool {
    let years: BTreeSet<u16> = file_ids.iter().filter_map(|id| FileId::year_of(id)).collect();
    years.len() > 1
}

/// Files from the given years plus files without a year
///
/// Empty when no file carries one of the years.
fn narrow_to_years(file_ids: &[String], years: &BTreeSet<u16>) -> Vec<String> {
    let in_years = |id: &String| FileId::year_of(id).is_some_and(|year| years.contains(&year));
    if !file_ids.iter().any(in_years) {
        return Vec::new();
    }
    file_ids
        .iter()
        .filter(|id| FileId::year_of(id).is_none_or(|year| years.contains(&year)))
        .cloned()
        .collect()
}

fn decide(pairs: ComparablePairs, requested: Vec<String>) -> GateDecision {
    if pairs.invalid.is_empty() {
        return GateDecision::proceed(requested, true);
    }

    let allowed: Vec<String> = requested
        .into_iter()
        .filter(|id| pairs.valid.contains(id))
        .collect();
    if allowed.is_empty() {
        let message = pairs
            .message
            .clone()
            .unwrap_or_else(|| DEFAULT_BLOCK_MESSAGE.to_string());
        return GateDecision::blocked(message, pairs.invalid);
    }

    let advisory = format_degraded_advisory(&pairs);
    GateDecision::degraded(allowed, pairs.invalid, advisory)
}

/// Distinct ids in first-seen order
fn dedup<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
