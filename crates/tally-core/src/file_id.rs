//! Dataset file identifiers
//!
//! Files are named `{year}_{question}[_{sub}]`, for example `2025_7_6`,
//! optionally with a `.json` suffix.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static FILE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})_([^_]+)(?:_(.+))?$").expect("valid file id regex"));

/// Strip a trailing `.json` and surrounding whitespace
pub fn normalize_file_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".json").unwrap_or(trimmed)
}

/// A parsed dataset file identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    /// Survey year
    pub year: u16,
    /// Question number within the survey
    pub question: String,
    /// Sub-question, when the question is split across files
    pub sub_question: Option<String>,
}

impl FileId {
    /// Parse an identifier; `None` when it does not start with a year
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = FILE_ID.captures(normalize_file_id(raw))?;
        Some(Self {
            year: caps[1].parse().ok()?,
            question: caps[2].to_string(),
            sub_question: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Year embedded in an identifier, if any
    pub fn year_of(raw: &str) -> Option<u16> {
        Self::parse(raw).map(|id| id.year)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_question {
            Some(sub) => write!(f, "{}_{}_{}", self.year, self.question, sub),
            None => write!(f, "{}_{}", self.year, self.question),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_sub_question() {
        let id = FileId::parse("2025_7_6").unwrap();
        assert_eq!(id.year, 2025);
        assert_eq!(id.question, "7");
        assert_eq!(id.sub_question.as_deref(), Some("6"));
        assert_eq!(id.to_string(), "2025_7_6");
    }

    #[test]
    fn test_parse_strips_json_suffix() {
        let id = FileId::parse("2024_1.json").unwrap();
        assert_eq!(id.year, 2024);
        assert_eq!(id.question, "1");
        assert_eq!(id.sub_question, None);
        assert_eq!(normalize_file_id(" 2024_1.json "), "2024_1");
    }

    #[test]
    fn test_unparseable_ids() {
        assert_eq!(FileId::parse("global_overview"), None);
        assert_eq!(FileId::parse("25_1"), None);
        assert_eq!(FileId::year_of("2026_12"), Some(2026));
        assert_eq!(FileId::year_of("notes"), None);
    }
}
