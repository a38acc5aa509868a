//! End-to-end interview flow tests.
//!
//! These tests drive sessions through the service from the opening
//! scoping question to the final report, checking routing, costing,
//! caching and the directives issued along the way.

use std::sync::Arc;

use catalyst::assessment::{Competency, ComplexityLevel, ReasoningStrategy};
use catalyst::config::Config;
use catalyst::orchestration::{
    Collaborator, DirectiveCommand, EvaluationRequest, GateDecision, Intervention,
    InterviewService, NextAction, NullStore, SessionCommand,
};
use catalyst::provider::KeywordProvider;
use catalyst::{Error, InterviewPhase, SessionId};

use crate::fixtures::{
    commands, drain, service_with, start, ScriptedProvider, OTHER_SHORT_ANSWER, SHORT_ANSWER,
};

/// Test: Plain 80-word scoping answer
/// Given a fresh session in scoping and the keyword provider
/// When an 80-word answer without indicators arrives
/// Then it is routed LOW/LEAN, costs 160 tokens at 0.0002 and is probed
#[tokio::test]
async fn test_plain_scoping_answer_is_lean_and_probed() {
    let (service, mut rx) = InterviewService::new(
        &Config::default(),
        Arc::new(KeywordProvider::new()),
        Arc::new(NullStore),
    );
    let id = start(&service, &mut rx, "s1");

    let response = vec!["word"; 80].join(" ");
    let report = service
        .handle_request(EvaluationRequest::new("s1", response).with_phase("scoping"))
        .await
        .unwrap();

    assert_eq!(report.complexity, ComplexityLevel::Low);
    assert_eq!(report.strategy, ReasoningStrategy::Lean);
    assert!(!report.routing_overridden);

    let evaluation = report.evaluation.as_ref().expect("evaluation expected");
    assert_eq!(evaluation.competencies.len(), 3);
    assert_eq!(evaluation.performance.tokens_used, 160);
    assert!((evaluation.performance.cost - 0.0002).abs() < 1e-12);
    assert!(!evaluation.performance.cache_hit);
    assert_eq!(evaluation.score(Competency::ProblemDefinition), Some(2.0));

    assert!(!report.gate.passed());
    assert!(matches!(report.next_action, NextAction::Probe { .. }));
    assert_eq!(report.phase, InterviewPhase::Scoping);

    let directives = drain(&mut rx);
    assert_eq!(commands(&directives), vec![DirectiveCommand::ProbeFollowUp]);
    assert_eq!(directives[0].param("focus"), Some("Problem Definition"));

    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.turns, 1);
    assert_eq!(metrics.interventions, 1);
    assert_eq!(metrics.complexity, Some(ComplexityLevel::Low));
}

/// Test: Replayed answer
/// Given a turn that has already been evaluated
/// When the same answer is submitted again in the same phase
/// Then the cached result is served with identical scores and no new cost
#[tokio::test]
async fn test_replayed_answer_is_served_from_cache() {
    let provider = Arc::new(ScriptedProvider::uniform(2.5));
    let (service, mut rx) = service_with(Arc::clone(&provider));
    let id = start(&service, &mut rx, "s1");

    let first = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    let calls_after_first = provider.calls();

    let second = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();

    let first_eval = first.evaluation.unwrap();
    let second_eval = second.evaluation.unwrap();
    assert!(!first_eval.performance.cache_hit);
    assert!(second_eval.performance.cache_hit);
    assert_eq!(first_eval.competencies, second_eval.competencies);
    assert_eq!(provider.calls(), calls_after_first);

    let telemetry = service.telemetry();
    assert_eq!(telemetry.computed, 1);
    assert_eq!(telemetry.cache_hits, 1);
    assert!((telemetry.hit_rate() - 0.5).abs() < 1e-9);

    let metrics = service.session_metrics(&id).await.unwrap();
    assert!((metrics.cost - first_eval.performance.cost).abs() < 1e-12);
    assert_eq!(metrics.turns, 2);
}

/// Test: Full interview
/// Given a provider that scores every competency at 4.0
/// When one answer is given in each evaluated phase
/// Then the session walks Scoping -> Analysis -> Synthesis -> Complete and
/// the report and coaching plan are requested
#[tokio::test]
async fn test_full_interview_reaches_complete() {
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, mut rx) = service_with(provider);
    let id = service.start_session(Some(SessionId::from("s1"))).unwrap();
    assert_eq!(
        commands(&drain(&mut rx)),
        vec![DirectiveCommand::AskScopingQuestion]
    );

    let answers = [
        (SHORT_ANSWER, InterviewPhase::Analysis),
        (OTHER_SHORT_ANSWER, InterviewPhase::Synthesis),
        ("To sum up, the first release targets commuters.", InterviewPhase::Complete),
    ];
    for (answer, expected) in answers {
        let report = service
            .handle_request(EvaluationRequest::new("s1", answer))
            .await
            .unwrap();
        assert!(report.gate.passed(), "gate should pass: {:?}", report.gate);
        assert_eq!(report.next_action, NextAction::Advance { to: expected });
        assert_eq!(report.phase, expected);
        assert!(report.advanced());
    }

    let directives = drain(&mut rx);
    assert_eq!(
        commands(&directives),
        vec![
            DirectiveCommand::PhaseTransition,
            DirectiveCommand::PhaseTransition,
            DirectiveCommand::GenerateReport,
            DirectiveCommand::GenerateCoachingPlan,
        ]
    );
    assert_eq!(directives[0].param("new_phase"), Some("analysis"));
    assert_eq!(directives[2].target, Collaborator::Synthesis);
    assert_eq!(directives[3].target, Collaborator::Coaching);

    let metrics = service.session_metrics(&id).await.unwrap();
    assert_eq!(metrics.phase, InterviewPhase::Complete);
    assert_eq!(metrics.transitions, 4);
    assert_eq!(metrics.interventions, 0);
    assert_eq!(metrics.scores.get(&Competency::Communication), Some(&4.0));

    let err = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));

    let closed = service.close_session(&id).await.unwrap();
    assert_eq!(closed.phase, InterviewPhase::Complete);
    assert_eq!(service.session_count(), 0);
}

/// Test: End command mid-interview
/// Given a session in analysis
/// When the candidate ends the interview
/// Then the session completes without a gate and the report is requested
#[tokio::test]
async fn test_end_command_completes_from_analysis() {
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, mut rx) = service_with(provider);
    let id = start(&service, &mut rx, "s1");

    service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    drain(&mut rx);

    let command: SessionCommand = "end_interview".parse().unwrap();
    let phase = service.command(&id, command).await.unwrap();
    assert_eq!(phase, InterviewPhase::Complete);
    assert_eq!(
        commands(&drain(&mut rx)),
        vec![
            DirectiveCommand::GenerateReport,
            DirectiveCommand::GenerateCoachingPlan
        ]
    );
}

/// Test: Turn before start
/// Given a service with no session for the id
/// When a request arrives
/// Then it is rejected without evaluating anything
#[tokio::test]
async fn test_request_for_unknown_session_is_rejected() {
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, _rx) = service_with(Arc::clone(&provider));

    let err = service
        .handle_request(EvaluationRequest::new("nobody", SHORT_ANSWER))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionNotFound(_)));
    assert_eq!(provider.calls(), 0);

    let err = service
        .handle_request(EvaluationRequest::new("", SHORT_ANSWER))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

/// Test: Empty answer
/// Given a session in scoping
/// When an empty response arrives
/// Then it is still assessed (LOW), evaluated and gated closed
#[tokio::test]
async fn test_empty_answer_is_still_routed() {
    let (service, mut rx) = InterviewService::new(
        &Config::default(),
        Arc::new(KeywordProvider::new()),
        Arc::new(NullStore),
    );
    start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", ""))
        .await
        .unwrap();
    assert_eq!(report.complexity, ComplexityLevel::Low);
    assert_eq!(report.strategy, ReasoningStrategy::Lean);
    let evaluation = report.evaluation.unwrap();
    assert_eq!(evaluation.performance.tokens_used, 0);
    assert!(matches!(report.gate, GateDecision::BelowBar { .. }));
    assert_eq!(
        report.next_action,
        NextAction::Probe {
            intervention: Intervention::HandleSilenceOrConfusion
        }
    );
}
