//! Query heuristics: comparison detection, year mentions and topic drift

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use std::collections::{BTreeSet, HashSet};

static YEAR_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:19|20)\d{2}|last year|previous year|year[- ]on[- ]year|year over year|yoy)\b")
        .expect("valid year mention regex")
});

static COMPARISON_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(compar(e|ed|ing|ison)|vs\.?|versus|differ(ence|ent)|change[sd]?|trend|over time)\b")
        .expect("valid comparison terms regex")
});

static RELATIVE_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(last year|previous year|prior year|year[\s-]on[\s-]year|year[\s-]over[\s-]year|yoy|across years)\b")
        .expect("valid relative year regex")
});

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year regex"));

/// Phrasings that ask for a comparison without the usual vocabulary pair
static COMPARISON_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bbetween (19|20)\d{2} and (19|20)\d{2}\b",
        r"(?i)\bfrom (19|20)\d{2} to (19|20)\d{2}\b",
        r"(?i)\b(19|20)\d{2} to (19|20)\d{2}\b",
        r"(?i)\bevolution\b.*\bbetween\b",
        r"(?i)\bevolution (from|since|over|between)\b",
        r"(?i)\bcompare (\w+ )?(year|time)\b",
        r"(?i)\bacross (years|time)\b",
        r"(?i)^what about (in )?(19|20)\d{2}\b",
        r"(?i)^what about (the )?(previous|last) year\b",
        r"(?i)\bhow has this changed\b",
        r"(?i)\bhas this improved\b",
        r"(?i)\byear by year\b",
        r"(?i)\b(yearly|annual) (trend|comparison)\b",
        r"(?i)\bhistorical (comparison|data)\b",
        r"(?i)\b(show me|show the|data from) (19|20)\d{2}\b",
        r"(?i)\b(worse or better|better or worse) than\b",
        r"(?i)\bare these (better|worse)\b",
        r"(?i)\bhow did (the|this)\b.*\bchange\b",
    ])
    .expect("valid comparison pattern set")
});

static QUERY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^query:\s*").expect("valid query prefix regex"));

static ANALYSIS_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\n\s*\n\s*(analysis|summary)").expect("valid analysis section regex")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const COURTESY_PREFIXES: &[&str] = &[
    "hey",
    "hi",
    "hello",
    "could you",
    "can you",
    "please",
    "tell me",
    "i want to know",
    "i'd like to know",
];

/// Clean a query for storage and comparison
///
/// Drops a `Query:` wrapper and any trailing analysis sections, collapses
/// whitespace, strips courtesy openers and cuts anything after the last
/// question mark.
pub fn normalize_query(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(section) = ANALYSIS_SECTION.find(text) {
        text = &text[..section.start()];
    }
    let text = QUERY_PREFIX.replace(text.trim(), "");
    let mut normalized = WHITESPACE.replace_all(text.trim(), " ").into_owned();

    for prefix in COURTESY_PREFIXES {
        let has_prefix = normalized
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            && normalized[prefix.len()..].starts_with(' ');
        if has_prefix {
            normalized = normalized[prefix.len()..].trim_start().to_string();
        }
    }

    if !normalized.ends_with('?') {
        if let Some(last) = normalized.rfind('?') {
            normalized.truncate(last + 1);
        }
    }
    normalized.trim().to_string()
}

/// Whether a query asks to compare data across survey years
pub fn is_comparison_query(query: &str) -> bool {
    if query.trim().is_empty() {
        return false;
    }
    if YEAR_MENTION.is_match(query) && COMPARISON_TERMS.is_match(query) {
        return true;
    }
    COMPARISON_PATTERNS.is_match(query.trim())
}

/// Four-digit years named in a query
pub fn mentioned_years(query: &str) -> BTreeSet<u16> {
    YEAR.captures_iter(query)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Whether a query refers to another year without naming it
pub fn mentions_relative_year(query: &str) -> bool {
    RELATIVE_YEAR.is_match(query)
}

/// Distinct lowercase words longer than `min_word_length`
fn significant_words(text: &str, min_word_length: usize) -> HashSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > min_word_length)
        .collect()
}

/// Share of the current query's significant words found in the previous one
pub fn overlap_ratio(current: &str, previous: &str, min_word_length: usize) -> f64 {
    let current = significant_words(current, min_word_length);
    let previous = significant_words(previous, min_word_length);
    let overlap = current.intersection(&previous).count();
    overlap as f64 / current.len().max(1) as f64
}

/// Whether `current` starts a new topic relative to `previous`
///
/// Any query counts as new when there is no previous one.
pub fn is_new_topic(current: &str, previous: &str, threshold: f64, min_word_length: usize) -> bool {
    if previous.trim().is_empty() {
        return true;
    }
    let ratio = overlap_ratio(current, previous, min_word_length);
    tracing::debug!("query overlap ratio {:.2}", ratio);
    ratio < threshold
}
