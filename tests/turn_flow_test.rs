//! End-to-end turn flow integration test
//!
//! Drives the turn coordinator against a mapping file on disk, an
//! in-memory store selected through a TOML config, and simple fixture
//! collaborators.

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tally_core::compat::IndexLoader;
use tally_core::config::{TallyConfig, load_from_file};
use tally_core::keys::thread_meta_key;
use tally_core::store::{BackendType, CacheStore, connect};
use tally_core::thread::{CachedFile, ThreadCacheManager};
use tally_core::turn::{
    FileIdentification, FileIdentifier, IdentifyRequest, SegmentLoader, TurnCoordinator,
    TurnOutcome, TurnRequest,
};
use tally_core::{GateOutcome, TallyResult};
use tempfile::TempDir;

const MAPPING: &str = r#"{
  "metadata": { "version": "3.0" },
  "themes": [
    {
      "name": "Talent",
      "topics": [
        {
          "id": "Attraction_Factors",
          "comparable": false,
          "userMessage": "Attraction factors changed between survey years.",
          "mapping": { "2024": ["2024_4"], "2025": ["2025_4"] }
        },
        {
          "id": "Pay_Satisfaction",
          "comparable": true,
          "mapping": { "2024": ["2024_8"], "2025": ["2025_8"] }
        }
      ]
    }
  ],
  "dataAccess": { "comparableMarkets": ["United Kingdom"] }
}"#;

/// Picks files by keyword, returning both survey years
struct KeywordIdentifier;

#[async_trait]
impl FileIdentifier for KeywordIdentifier {
    async fn identify(&self, request: &IdentifyRequest) -> TallyResult<FileIdentification> {
        let query = request.query.to_lowercase();
        let question = if query.contains("attraction") {
            "4"
        } else if query.contains("pay") {
            "8"
        } else {
            return Ok(FileIdentification::default());
        };
        Ok(FileIdentification {
            file_ids: vec![format!("2024_{}", question), format!("2025_{}", question)],
            segments: vec!["overall".to_string()],
            matched_topics: Vec::new(),
        })
    }
}

/// Serves a fixed payload for every requested segment
struct FixtureLoader;

#[async_trait]
impl SegmentLoader for FixtureLoader {
    async fn load(&self, file_id: &str, segments: &[String]) -> TallyResult<CachedFile> {
        let mut file = CachedFile::new(file_id).with_available_segments(["overall", "country"]);
        for segment in segments {
            file.insert_segment(segment.clone(), json!({ "file": file_id, "n": 1200 }));
        }
        Ok(file)
    }
}

fn write_fixtures(dir: &Path) -> TallyConfig {
    let mapping_path = dir.join("canonical_topic_mapping.json");
    std::fs::write(&mapping_path, MAPPING).unwrap();

    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[store]\nbackend = \"memory\"\nmemory_capacity = 500\n\n\
             [compatibility]\nmapping_path = {:?}\n\n\
             [thread]\nhistory_limit = 3\n",
            mapping_path.display().to_string()
        ),
    )
    .unwrap();

    load_from_file(&config_path).unwrap()
}

async fn setup() -> (TempDir, TurnCoordinator, CacheStore) {
    let dir = TempDir::new().unwrap();
    let config = write_fixtures(dir.path());

    let store = CacheStore::new(connect(&config.store).await.unwrap());
    assert_eq!(store.backend_type(), BackendType::Memory);

    let threads = ThreadCacheManager::new(store.clone()).with_config(config.thread.clone());
    let mapping_path = config.compatibility.mapping_path.clone().unwrap();
    let source = Arc::new(IndexLoader::new(
        mapping_path,
        config.compatibility.forced_non_comparable.clone(),
    ));
    let coordinator =
        TurnCoordinator::new(source, threads, Arc::new(KeywordIdentifier), Arc::new(FixtureLoader));
    (dir, coordinator, store)
}

#[tokio::test]
async fn test_incompatible_comparison_is_blocked() {
    let (_dir, coordinator, _store) = setup().await;

    let outcome = coordinator
        .run(&TurnRequest::new("Compare attraction factors between 2024 and 2025").in_thread("t1"))
        .await;

    let TurnOutcome::Blocked(payload) = outcome else {
        panic!("expected the comparison to be blocked");
    };
    assert_eq!(
        serde_json::to_value(&payload).unwrap(),
        json!({
            "incompatible_comparison": true,
            "message": "Attraction factors changed between survey years."
        })
    );
}

#[tokio::test]
async fn test_comparable_conversation_is_cached() {
    let (_dir, coordinator, store) = setup().await;

    let first = coordinator
        .run(&TurnRequest::new("How has pay satisfaction changed since 2024 vs 2025?").in_thread("t1"))
        .await;
    let turn = first.processed().unwrap();
    assert_eq!(turn.decision.outcome, GateOutcome::Proceed);
    assert!(turn.decision.is_comparison);
    assert_eq!(turn.result.files().len(), 2);
    assert_eq!(turn.advisory, None);

    let record: serde_json::Value = store.get_json(&thread_meta_key("t1")).await.unwrap();
    let files = record["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["loadedSegments"], json!(["overall"]));
    assert_eq!(record["compatibilityMetadata"]["mappingVersion"], "3.0");

    let summary = coordinator.threads().summary("t1").await.unwrap();
    assert_eq!(summary.history_length, 1);
    assert_eq!(summary.is_fully_compatible, Some(true));
}

#[tokio::test]
async fn test_history_is_bounded_by_config() {
    let (_dir, coordinator, _store) = setup().await;

    for question in [
        "What drives pay satisfaction?",
        "What drives pay satisfaction among managers?",
        "What drives pay satisfaction among graduates?",
        "What drives pay satisfaction among engineers?",
    ] {
        coordinator
            .run(&TurnRequest::new(question).in_thread("t1"))
            .await;
    }

    let context = coordinator.threads().get_context("t1").await;
    assert_eq!(context.previous_queries.len(), 3);
    assert_eq!(
        context.previous_queries[0],
        "What drives pay satisfaction among engineers?"
    );
    assert!(context.is_follow_up);
}

#[tokio::test]
async fn test_missing_mapping_fails_open() {
    let dir = TempDir::new().unwrap();
    let threads = ThreadCacheManager::new(CacheStore::in_memory(50));
    let source = Arc::new(IndexLoader::new(
        dir.path().join("absent.json"),
        Vec::new(),
    ));
    let coordinator =
        TurnCoordinator::new(source, threads, Arc::new(KeywordIdentifier), Arc::new(FixtureLoader));

    let outcome = coordinator
        .run(&TurnRequest::new("Compare attraction factors between 2024 and 2025").in_thread("t1"))
        .await;

    let turn = outcome.processed().unwrap();
    assert_eq!(turn.decision.outcome, GateOutcome::Proceed);
    assert_eq!(turn.result.files().len(), 2);
    let compatibility = turn.compatibility.as_ref().unwrap();
    assert!(compatibility.error.is_some());
    assert!(turn.advisory.as_deref().unwrap().starts_with("IMPORTANT:"));
}
