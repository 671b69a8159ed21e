//! Fixtures shared by unit tests

use crate::compat::CompatibilityIndex;
use std::sync::Arc;

/// Small canonical mapping covering the interesting cases
///
/// - `Attraction_Factors` is flagged comparable but holds question 1,
///   which the default override forces to non-comparable
/// - `Retention_Factors` is non-comparable with data for two years
/// - `Work_Life_Balance` and `Remote_Work` are comparable
/// - `Leadership_Confidence` is non-comparable but only exists in 2025
pub const SAMPLE_MAPPING: &str = r#"{
  "metadata": { "version": "2.1", "lastUpdated": "2025-05-01" },
  "themes": [
    {
      "name": "Talent",
      "topics": [
        {
          "id": "Attraction_Factors",
          "comparable": true,
          "userMessage": "Attraction factors cannot be compared year-on-year because the question changed.",
          "availableMarkets": ["United Kingdom"],
          "mapping": {
            "2024": [{ "id": "Q1", "file": "2024_1.json" }],
            "2025": [{ "id": "1", "file": "2025_1.json" }]
          }
        },
        {
          "id": "Retention_Factors",
          "comparable": false,
          "userMessage": "Retention factors were measured differently in 2025.",
          "mapping": { "2024": ["2024_2"], "2025": ["2025_2"] }
        },
        {
          "id": "Work_Life_Balance",
          "comparable": true,
          "availableMarkets": ["United Kingdom", "United States"],
          "mapping": {
            "2024": ["2024_7_1"],
            "2025": [{ "file": "2025_7_6.json" }]
          }
        }
      ]
    },
    {
      "name": "Culture",
      "topics": [
        {
          "id": "Leadership_Confidence",
          "comparable": false,
          "userMessage": "Leadership confidence was first asked in 2025.",
          "mapping": { "2024": [], "2025": ["2025_12"] }
        },
        {
          "id": "Remote_Work",
          "comparable": true,
          "mapping": { "2024": ["Q9"], "2025": ["2025_9"] }
        }
      ]
    }
  ],
  "dataAccess": { "comparableMarkets": ["United Kingdom", "United States"] },
  "globalFiles": {
    "market_overview": { "comparable": false, "description": "Market overview, not year specific" }
  }
}"#;

pub fn default_forced() -> Vec<String> {
    vec!["1".to_string(), "2".to_string(), "3".to_string()]
}

pub fn sample_index() -> Arc<CompatibilityIndex> {
    Arc::new(
        CompatibilityIndex::from_json(SAMPLE_MAPPING, &default_forced())
            .expect("sample mapping parses"),
    )
}
