//! Tests for query turns

use super::*;
use crate::compat::CompatibilityMetadata;
use crate::error::TallyError;
use crate::gate::{GateOutcome, MockCompatibilitySource};
use crate::store::CacheStore;
use crate::test_support::sample_index;
use crate::thread::{CachedFile, ThreadCacheManager};
use serde_json::json;
use std::sync::Arc;

fn coordinator(
    identifier: MockFileIdentifier,
    loader: MockSegmentLoader,
) -> (TurnCoordinator, ThreadCacheManager) {
    let threads = ThreadCacheManager::new(CacheStore::in_memory(100));
    let coordinator = TurnCoordinator::new(
        sample_index(),
        threads.clone(),
        Arc::new(identifier),
        Arc::new(loader),
    );
    (coordinator, threads)
}

fn identifies(ids: &'static [&'static str]) -> MockFileIdentifier {
    let mut identifier = MockFileIdentifier::new();
    identifier.expect_identify().returning(move |_| {
        Ok(FileIdentification {
            file_ids: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        })
    });
    identifier
}

fn loaded_file(file_id: &str, segments: &[String]) -> CachedFile {
    let mut file = CachedFile::new(file_id).with_available_segments(["overall", "age"]);
    for segment in segments {
        file.insert_segment(segment.clone(), json!({"file": file_id, "segment": segment}));
    }
    file
}

fn loads_anything() -> MockSegmentLoader {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    loader
}

fn ids(files: &[CachedFile]) -> Vec<&str> {
    files.iter().map(CachedFile::id).collect()
}

fn processed(outcome: &TurnOutcome) -> &ProcessedQuery {
    outcome.processed().expect("turn was processed")
}

#[tokio::test]
async fn test_first_turn_loads_and_caches() {
    let (coordinator, threads) = coordinator(identifies(&["2025_7_6"]), loads_anything());
    let request = TurnRequest::new("What drives work life balance?").in_thread("t1");

    let outcome = coordinator.run(&request).await;
    let turn = processed(&outcome);

    assert!(turn.result.is_data());
    assert_eq!(ids(turn.result.files()), vec!["2025_7_6"]);
    assert!(turn.result.files()[0].segment(DEFAULT_SEGMENT).is_some());
    assert!(!turn.is_follow_up);
    assert_eq!(turn.decision.outcome, GateOutcome::Proceed);
    assert!(turn.compatibility.as_ref().unwrap().is_fully_compatible);
    assert_eq!(turn.advisory, None);

    let cached = threads.get_cached_files("t1").await;
    assert_eq!(ids(&cached), vec!["2025_7_6"]);
    let context = threads.get_context("t1").await;
    assert_eq!(context.previous_queries, vec!["What drives work life balance?"]);
    assert!(threads.get_compatibility_metadata("t1").await.is_some());
}

#[tokio::test]
async fn test_follow_up_reuses_cached_files_and_metadata() {
    let mut identifier = MockFileIdentifier::new();
    identifier.expect_identify().times(1).returning(|_| {
        Ok(FileIdentification {
            file_ids: vec!["2025_7_6".into()],
            ..Default::default()
        })
    });
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .times(1)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    let (coordinator, threads) = coordinator(identifier, loader);

    coordinator
        .run(&TurnRequest::new("What drives work life balance?").in_thread("t1"))
        .await;
    let stored = threads.get_compatibility_metadata("t1").await.unwrap();

    let outcome = coordinator
        .run(&TurnRequest::new("What drives work life balance for managers?").in_thread("t1"))
        .await;
    let turn = processed(&outcome);

    assert!(turn.is_follow_up);
    assert_eq!(ids(turn.result.files()), vec!["2025_7_6"]);
    assert_eq!(
        turn.compatibility.as_ref().unwrap().assessed_at,
        stored.assessed_at
    );
    assert_eq!(threads.get_context("t1").await.previous_queries.len(), 2);
}

#[tokio::test]
async fn test_follow_up_loads_only_missing_segments() {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .withf(|_, segments| segments.len() == 1 && segments[0] == "overall")
        .times(1)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    loader
        .expect_load()
        .withf(|_, segments| segments.len() == 1 && segments[0] == "age")
        .times(1)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    let (coordinator, threads) = coordinator(identifies(&["2025_7_6"]), loader);

    coordinator
        .run(&TurnRequest::new("What drives work life balance?").in_thread("t1"))
        .await;
    let outcome = coordinator
        .run(
            &TurnRequest::new("What drives work life balance by age?")
                .in_thread("t1")
                .with_segments(["overall", "age"]),
        )
        .await;

    let file = &processed(&outcome).result.files()[0];
    assert!(file.is_loaded("overall"));
    assert!(file.is_loaded("age"));

    let cached = threads.get_cached_file("t1", "2025_7_6").await.unwrap();
    assert!(cached.is_loaded("age"));
}

#[tokio::test]
async fn test_single_year_query_keeps_latest_year() {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .withf(|file_id, _| file_id == "2025_7_6")
        .times(1)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    let (coordinator, _) = coordinator(identifies(&["2024_7_1", "2025_7_6"]), loader);

    let outcome = coordinator
        .run(&TurnRequest::new("Show work life balance results"))
        .await;
    assert_eq!(ids(processed(&outcome).result.files()), vec!["2025_7_6"]);
}

#[tokio::test]
async fn test_single_year_query_keeps_named_year() {
    let (coordinator, _) = coordinator(identifies(&["2024_7_1", "2025_7_6"]), loads_anything());

    let outcome = coordinator
        .run(&TurnRequest::new("What was work life balance like in 2024?"))
        .await;
    assert_eq!(ids(processed(&outcome).result.files()), vec!["2024_7_1"]);
}

#[tokio::test]
async fn test_relative_year_keeps_all_years() {
    let (coordinator, _) = coordinator(identifies(&["2024_7_1", "2025_7_6"]), loads_anything());

    let outcome = coordinator
        .run(&TurnRequest::new("How does work life balance look against last year?"))
        .await;
    assert_eq!(
        ids(processed(&outcome).result.files()),
        vec!["2024_7_1", "2025_7_6"]
    );
}

#[tokio::test]
async fn test_blocked_comparison_loads_nothing() {
    let mut loader = MockSegmentLoader::new();
    loader.expect_load().never();
    let (coordinator, threads) = coordinator(identifies(&["2024_2", "2025_2"]), loader);

    let outcome = coordinator
        .run(
            &TurnRequest::new("Compare retention factors between 2024 and 2025").in_thread("t1"),
        )
        .await;

    let TurnOutcome::Blocked(payload) = outcome else {
        panic!("expected a blocked turn");
    };
    assert!(payload.incompatible_comparison);
    assert_eq!(
        payload.message,
        "Retention factors were measured differently in 2025."
    );
    assert!(threads.get_cached_files("t1").await.is_empty());
    assert_eq!(threads.get_context("t1").await.previous_queries.len(), 1);
}

#[tokio::test]
async fn test_single_named_year_comparison_loads_that_year() {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .withf(|file_id, _| file_id == "2025_2")
        .times(1)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    let (coordinator, _) = coordinator(identifies(&["2024_2", "2025_2"]), loader);

    let outcome = coordinator
        .run(&TurnRequest::new("What is the difference between men and women in 2025?"))
        .await;
    let turn = processed(&outcome);

    assert!(!outcome.is_blocked());
    assert_eq!(turn.decision.outcome, GateOutcome::Proceed);
    assert!(turn.decision.is_comparison);
    assert_eq!(ids(turn.result.files()), vec!["2025_2"]);
}

#[tokio::test]
async fn test_cached_other_topic_years_do_not_block_single_year_comparison() {
    let (coordinator, threads) = coordinator(identifies(&["2025_2"]), loads_anything());
    threads
        .update_with_files(
            "t1",
            &[CachedFile::new("2024_7_1"), CachedFile::new("2025_7_6")],
            Some(CompatibilityMetadata::new("2.1")),
        )
        .await;

    let outcome = coordinator
        .run(
            &TurnRequest::new("What is the difference between men and women in 2025?")
                .in_thread("t1"),
        )
        .await;

    assert!(!outcome.is_blocked());
    assert_eq!(ids(processed(&outcome).result.files()), vec!["2025_2"]);
}

#[tokio::test]
async fn test_degraded_comparison_loads_comparable_subset() {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .withf(|file_id, _| file_id.ends_with("_9"))
        .times(2)
        .returning(|file_id, segments| Ok(loaded_file(file_id, segments)));
    let (coordinator, threads) = coordinator(
        identifies(&["2024_2", "2025_2", "2024_9", "2025_9"]),
        loader,
    );

    let outcome = coordinator
        .run(
            &TurnRequest::new("Compare retention and remote work between 2024 and 2025")
                .in_thread("t1"),
        )
        .await;
    let turn = processed(&outcome);

    assert_eq!(turn.decision.outcome, GateOutcome::DegradedProceed);
    assert_eq!(ids(turn.result.files()), vec!["2024_9", "2025_9"]);
    assert!(
        turn.advisory
            .as_deref()
            .unwrap()
            .starts_with("IMPORTANT: Only part of this comparison")
    );
    assert_eq!(
        ids(&threads.get_cached_files("t1").await),
        vec!["2024_9", "2025_9"]
    );
}

#[tokio::test]
async fn test_incompatible_load_evicts_stale_year() {
    let mut identifier = MockFileIdentifier::new();
    identifier.expect_identify().returning(|request| {
        let file_id = if request.query.contains("2024") { "2024_1" } else { "2025_1" };
        Ok(FileIdentification {
            file_ids: vec![file_id.to_string()],
            ..Default::default()
        })
    });
    let (coordinator, threads) = coordinator(identifier, loads_anything());

    coordinator
        .run(&TurnRequest::new("What are the top attraction factors?").in_thread("t1"))
        .await;
    assert_eq!(ids(&threads.get_cached_files("t1").await), vec!["2025_1"]);

    let outcome = coordinator
        .run(&TurnRequest::new("What were the top attraction factors in 2024?").in_thread("t1"))
        .await;
    let turn = processed(&outcome);

    assert_eq!(ids(turn.result.files()), vec!["2024_1"]);
    assert!(turn.advisory.is_some());
    assert_eq!(ids(&threads.get_cached_files("t1").await), vec!["2024_1"]);
}

#[tokio::test]
async fn test_identification_failure_reports_error() {
    let mut identifier = MockFileIdentifier::new();
    identifier
        .expect_identify()
        .returning(|_| Err(TallyError::http("upstream timeout")));
    let mut loader = MockSegmentLoader::new();
    loader.expect_load().never();
    let (coordinator, threads) = coordinator(identifier, loader);

    let outcome = coordinator
        .run(&TurnRequest::new("What drives work life balance?").in_thread("t1"))
        .await;

    match &processed(&outcome).result {
        ProcessedQueryResult::Error { message } => assert!(message.contains("upstream timeout")),
        other => panic!("expected an error result, got {:?}", other),
    }
    assert_eq!(threads.get_context("t1").await.previous_queries.len(), 1);
}

#[tokio::test]
async fn test_load_failure_reports_error() {
    let mut loader = MockSegmentLoader::new();
    loader
        .expect_load()
        .returning(|_, _| Err(TallyError::storage("bucket unavailable")));
    let (coordinator, threads) = coordinator(identifies(&["2025_7_6"]), loader);

    let outcome = coordinator
        .run(&TurnRequest::new("What drives work life balance?").in_thread("t1"))
        .await;

    assert!(matches!(
        processed(&outcome).result,
        ProcessedQueryResult::Error { .. }
    ));
    assert!(threads.get_cached_files("t1").await.is_empty());
}

#[tokio::test]
async fn test_nothing_identified_is_empty() {
    let mut loader = MockSegmentLoader::new();
    loader.expect_load().never();
    let (coordinator, _) = coordinator(identifies(&[]), loader);

    let outcome = coordinator.run(&TurnRequest::new("Tell me a joke")).await;
    assert!(matches!(
        processed(&outcome).result,
        ProcessedQueryResult::Empty { .. }
    ));
}

#[tokio::test]
async fn test_assessment_failure_becomes_advisory() {
    let mut source = MockCompatibilitySource::new();
    source
        .expect_topics_for_files()
        .returning(|_| Ok(vec!["Work_Life_Balance".to_string()]));
    source
        .expect_assess()
        .returning(|_, _| Err(TallyError::compatibility("mapping unavailable")));
    let coordinator = TurnCoordinator::new(
        Arc::new(source),
        ThreadCacheManager::new(CacheStore::in_memory(10)),
        Arc::new(identifies(&["2025_7_6"])),
        Arc::new(loads_anything()),
    );

    let outcome = coordinator
        .run(&TurnRequest::new("What drives work life balance?"))
        .await;
    let turn = processed(&outcome);

    let compatibility = turn.compatibility.as_ref().unwrap();
    assert!(compatibility.error.is_some());
    assert!(!compatibility.is_fully_compatible);
    assert_eq!(
        turn.advisory.as_deref(),
        Some("IMPORTANT: Unable to assess compatibility due to a technical issue")
    );
}
