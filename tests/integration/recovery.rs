//! Failure handling and recovery integration tests.
//!
//! These tests verify that timeouts, provider outages and panics fail the
//! gate closed without losing work: in-flight computations still populate
//! the cache, retries recover transient failures, and repeated failures
//! abandon the session.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use catalyst::config::Config;
use catalyst::evaluation::EvaluationResult;
use catalyst::orchestration::{
    DirectiveCommand, EvaluationRequest, GateDecision, JsonlStore, MemoryStore, NextAction,
    NullStore,
};
use catalyst::{Error, InterviewPhase, SessionId};

use crate::fixtures::{
    commands, drain, fast_fail_config, service_with_config, start, ScriptedProvider,
    OTHER_SHORT_ANSWER, SHORT_ANSWER,
};

/// Test: Evaluation timeout
/// Given a provider slower than the evaluation timeout
/// When a turn is submitted
/// Then the gate fails closed, and the computation still lands in the cache
/// so the resubmitted turn is served from it
#[tokio::test]
async fn test_timeout_fails_closed_and_still_populates_cache() {
    let config = fast_fail_config(50, 1, 3);
    let provider =
        Arc::new(ScriptedProvider::uniform(4.0).with_delay(Duration::from_millis(100)));
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    let id = start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert!(report.evaluation.is_none());
    assert!(matches!(report.gate, GateDecision::Unavailable { .. }));
    assert_eq!(report.next_action, NextAction::Retry);
    assert!(report.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(report.phase, InterviewPhase::Scoping);
    assert!(drain(&mut rx).is_empty(), "no probe on an unavailable gate");

    // LEAN scores three competencies one after another.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let telemetry = service.telemetry();
    assert_eq!(telemetry.timeouts, 1);
    assert_eq!(telemetry.computed, 1);
    assert_eq!(telemetry.cache_entries, 1);

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    let evaluation = report.evaluation.as_ref().expect("cached evaluation");
    assert!(evaluation.is_cache_hit());
    assert!(report.advanced());
    assert_eq!(provider.calls(), 3);

    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.consecutive_failures, 0);
    assert_eq!(metrics.phase, InterviewPhase::Analysis);
    assert!((metrics.cost - evaluation.performance.cost).abs() < 1e-12);
}

/// Test: Retry joins a timed-out computation
/// Given a provider slower than one attempt but faster than three
/// When a turn is submitted with three attempts allowed
/// Then the last attempt receives the result, which is stored once and
/// charged to the session
#[tokio::test]
async fn test_retry_after_timeout_stores_and_charges_result() {
    let config = fast_fail_config(50, 3, 3);
    let provider =
        Arc::new(ScriptedProvider::uniform(4.0).with_delay(Duration::from_millis(40)));
    let store = Arc::new(MemoryStore::new());
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::clone(&store) as _);
    let id = start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert!(report.error.is_none());
    assert!(report.advanced());
    let evaluation = report.evaluation.as_ref().expect("evaluation expected");
    assert!(evaluation.is_cache_hit());
    assert!(evaluation.performance.cost > 0.0);
    assert_eq!(provider.calls(), 3);

    let telemetry = service.telemetry();
    assert_eq!(telemetry.computed, 1);
    assert!(telemetry.timeouts >= 1);

    service.flush().await;
    assert_eq!(store.len(), 1);
    assert!(!store.results()[0].is_cache_hit());

    let metrics = service.session_metrics(&id).await.unwrap();
    assert!((metrics.cost - evaluation.performance.cost).abs() < 1e-12);
}

/// Test: Transient provider outage
/// Given a provider whose first call fails
/// When a turn is submitted with two attempts allowed
/// Then the retry succeeds and the turn is gated normally
#[tokio::test]
async fn test_retry_recovers_transient_failure() {
    let config = fast_fail_config(5_000, 2, 3);
    let provider = Arc::new(ScriptedProvider::uniform(4.0).failing_first(1));
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert!(report.error.is_none());
    assert!(report.evaluation.is_some());
    assert!(report.advanced());

    let telemetry = service.telemetry();
    assert_eq!(telemetry.failures, 1);
    assert_eq!(telemetry.computed, 1);
}

/// Test: Repeated failures
/// Given a provider that always fails and a limit of three failed turns
/// When three turns are submitted
/// Then the first two ask for a retry, the third abandons the session
#[tokio::test]
async fn test_repeated_failures_abandon_session() {
    let config = fast_fail_config(5_000, 1, 3);
    let provider = Arc::new(ScriptedProvider::uniform(4.0).failing_first(usize::MAX));
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    let id = start(&service, &mut rx, "s1");

    let mut actions = Vec::new();
    for _ in 0..3 {
        let report = service
            .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
            .await
            .unwrap();
        assert!(report.error.as_deref().unwrap().contains("scripted outage"));
        actions.push(report.next_action);
    }
    assert_eq!(
        actions,
        vec![NextAction::Retry, NextAction::Retry, NextAction::Abandon]
    );
    assert_eq!(
        commands(&drain(&mut rx)),
        vec![DirectiveCommand::SessionAbandoned]
    );

    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.phase, InterviewPhase::Abandoned);
    assert_eq!(metrics.consecutive_failures, 3);

    let err = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));
}

/// Test: Failure counter reset
/// Given one failed turn below the abandonment limit
/// When the next turn evaluates successfully
/// Then the consecutive failure count starts over
#[tokio::test]
async fn test_success_resets_failure_count() {
    let config = fast_fail_config(5_000, 1, 2);
    let provider = Arc::new(ScriptedProvider::uniform(2.0).failing_first(1));
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    let id = start(&service, &mut rx, "s1");

    let failed = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert_eq!(failed.next_action, NextAction::Retry);
    assert_eq!(
        service.session_metrics(&id).await.unwrap().consecutive_failures,
        1
    );

    let report = service
        .handle_request(EvaluationRequest::new("s1", OTHER_SHORT_ANSWER))
        .await
        .unwrap();
    assert!(matches!(report.next_action, NextAction::Probe { .. }));
    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.consecutive_failures, 0);
    assert_eq!(metrics.phase, InterviewPhase::Scoping);
}

/// Test: Panicking provider
/// Given a provider that panics while scoring
/// When a turn is submitted
/// Then the panic is contained, the turn reports a failure and the
/// service keeps serving
#[tokio::test]
async fn test_panicking_provider_is_contained() {
    let config = fast_fail_config(5_000, 2, 3);
    let provider = Arc::new(ScriptedProvider::uniform(4.0).panicking());
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    let id = start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert_eq!(report.next_action, NextAction::Retry);
    assert!(report.error.as_deref().unwrap().contains("panicked"));
    assert_eq!(service.telemetry().failures, 2);
    assert_eq!(service.telemetry().cache_entries, 0);

    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.phase, InterviewPhase::Scoping);
    assert!(service.start_session(Some(SessionId::from("s2"))).is_ok());
}

/// Test: Evaluations are persisted once
/// Given a JSON-lines store
/// When a turn is computed and then replayed from the cache
/// Then exactly one line is written for the computed result
#[tokio::test]
async fn test_jsonl_store_receives_computed_results_only() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("nested").join("evaluations.jsonl");
    let store = Arc::new(JsonlStore::new(&path));
    let provider = Arc::new(ScriptedProvider::uniform(2.0));
    let (service, mut rx) = service_with_config(&Config::default(), provider, store);
    start(&service, &mut rx, "s1");

    service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    service.flush().await;
    assert_eq!(read_lines(&path).len(), 1);

    service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    service.flush().await;
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1, "cache hits are not persisted again");

    let stored: EvaluationResult = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(stored.session_id.as_str(), "s1");
    assert_eq!(stored.phase, InterviewPhase::Scoping);
    assert!(!stored.performance.cache_hit);
}

/// Test: Flushed writes across sessions
/// Given two sessions sharing one store
/// When each computes one evaluation and the service is flushed
/// Then both results are stored without waiting any further
#[tokio::test]
async fn test_memory_store_collects_every_session() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, mut rx) =
        service_with_config(&Config::default(), provider, Arc::clone(&store) as _);
    start(&service, &mut rx, "a");
    start(&service, &mut rx, "b");

    for id in ["a", "b"] {
        service
            .handle_request(EvaluationRequest::new(id, SHORT_ANSWER))
            .await
            .unwrap();
    }

    service.flush().await;
    let mut sessions: Vec<String> = store
        .results()
        .into_iter()
        .map(|r| r.session_id.to_string())
        .collect();
    sessions.sort();
    assert_eq!(sessions, vec!["a".to_string(), "b".to_string()]);
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
