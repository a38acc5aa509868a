//! Phase gating integration tests.
//!
//! These tests verify that sessions only advance when the evaluated
//! competencies clear the configured bars, that failing turns trigger a
//! probing follow-up, and that routing hints cannot bypass a gate.

use std::sync::Arc;

use catalyst::assessment::{Competency, ComplexityLevel, ReasoningStrategy};
use catalyst::config::{CompetencyBar, Config};
use catalyst::orchestration::{
    DirectiveCommand, EvaluationRequest, GateDecision, Intervention, NextAction, NullStore,
    Shortfall,
};
use catalyst::InterviewPhase;

use crate::fixtures::{
    commands, drain, service_with, service_with_config, start, ScriptedProvider,
    OTHER_SHORT_ANSWER, SHORT_ANSWER,
};

/// Test: Scoping gate below the bar
/// Given Problem Definition scored 2.0 against a 3.0 bar
/// When the scoping answer is evaluated
/// Then the session stays in scoping and the Interviewer is asked to probe
#[tokio::test]
async fn test_scoping_below_bar_stays_and_probes() {
    let provider =
        Arc::new(ScriptedProvider::uniform(4.0).with_score(Competency::ProblemDefinition, 2.0));
    let (service, mut rx) = service_with(Arc::clone(&provider));
    start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();

    assert_eq!(report.phase, InterviewPhase::Scoping);
    assert_eq!(
        report.gate,
        GateDecision::BelowBar {
            shortfalls: vec![Shortfall {
                competency: Some(Competency::ProblemDefinition),
                required: 3.0,
                actual: Some(2.0),
            }]
        }
    );
    assert_eq!(
        report.next_action,
        NextAction::Probe {
            intervention: Intervention::PreventPrematureSolutioning
        }
    );

    let directives = drain(&mut rx);
    assert_eq!(commands(&directives), vec![DirectiveCommand::ProbeFollowUp]);
    let probe = &directives[0];
    assert_eq!(probe.param("phase"), Some("scoping"));
    assert_eq!(probe.param("focus"), Some("Problem Definition"));
    assert_eq!(
        probe.param("message"),
        Some(Intervention::PreventPrematureSolutioning.message())
    );

    // The stored evaluation is replayed for the same answer, so it still fails.
    provider.set_score(Competency::ProblemDefinition, 3.0);
    let replay = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert!(replay.evaluation.as_ref().unwrap().is_cache_hit());
    assert_eq!(replay.phase, InterviewPhase::Scoping);

    // A new answer meeting the bar exactly advances.
    let report = service
        .handle_request(EvaluationRequest::new("s1", OTHER_SHORT_ANSWER))
        .await
        .unwrap();
    assert_eq!(report.gate, GateDecision::Passed);
    assert_eq!(
        report.next_action,
        NextAction::Advance {
            to: InterviewPhase::Analysis
        }
    );
}

/// Test: Average bar in synthesis
/// Given a session in synthesis whose Communication passes but the mean does not
/// When the synthesis answer is evaluated
/// Then the average shortfall holds the session and prioritization is probed
#[tokio::test]
async fn test_synthesis_average_bar_holds_session() {
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, mut rx) = service_with(Arc::clone(&provider));
    start(&service, &mut rx, "s1");

    for answer in [SHORT_ANSWER, OTHER_SHORT_ANSWER] {
        let report = service
            .handle_request(EvaluationRequest::new("s1", answer))
            .await
            .unwrap();
        assert!(report.advanced());
    }
    drain(&mut rx);

    provider.set_score(Competency::ProblemDefinition, 1.0);
    provider.set_score(Competency::TechnicalDepth, 1.0);
    let report = service
        .handle_request(EvaluationRequest::new(
            "s1",
            "We ship the commuter flow before anything else.",
        ))
        .await
        .unwrap();

    assert_eq!(report.evaluated_phase, InterviewPhase::Synthesis);
    assert_eq!(report.phase, InterviewPhase::Synthesis);
    match &report.gate {
        GateDecision::BelowBar { shortfalls } => {
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].competency, None);
            assert_eq!(shortfalls[0].required, 3.0);
            assert_eq!(shortfalls[0].actual, Some(2.0));
        }
        other => panic!("expected average shortfall, got {other:?}"),
    }
    assert_eq!(
        report.next_action,
        NextAction::Probe {
            intervention: Intervention::DemandPrioritizationRationale
        }
    );
    assert_eq!(
        commands(&drain(&mut rx)),
        vec![DirectiveCommand::ProbeFollowUp]
    );
}

/// Test: Gated competency outside the routed strategy
/// Given a scoping gate on Trade-off Analysis, which LEAN does not score
/// When a short answer is routed to LEAN
/// Then the gate fails closed, and a CHAIN_OF_THOUGHT hint lets it pass
#[tokio::test]
async fn test_unscored_gate_fails_closed_until_strategy_covers_it() {
    let mut config = Config::default();
    config.gating.scoping.bars = vec![CompetencyBar::new(Competency::TradeoffAnalysis, 3.0)];
    let provider = Arc::new(ScriptedProvider::uniform(4.0));
    let (service, mut rx) =
        service_with_config(&config, Arc::clone(&provider), Arc::new(NullStore));
    start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER))
        .await
        .unwrap();
    assert_eq!(report.strategy, ReasoningStrategy::Lean);
    assert_eq!(
        report.gate,
        GateDecision::BelowBar {
            shortfalls: vec![Shortfall {
                competency: Some(Competency::TradeoffAnalysis),
                required: 3.0,
                actual: None,
            }]
        }
    );

    // A hint that still misses the gated competency is ignored.
    let report = service
        .handle_request(
            EvaluationRequest::new("s1", OTHER_SHORT_ANSWER).with_strategy_hint("lean"),
        )
        .await
        .unwrap();
    assert_eq!(report.strategy, ReasoningStrategy::Lean);
    assert!(!report.routing_overridden);
    assert!(!report.gate.passed());

    let report = service
        .handle_request(
            EvaluationRequest::new("s1", "Which trade-off matters most here?")
                .with_strategy_hint("chain_of_thought"),
        )
        .await
        .unwrap();
    assert_eq!(report.complexity, ComplexityLevel::Low);
    assert_eq!(report.strategy, ReasoningStrategy::ChainOfThought);
    assert!(report.routing_overridden);
    assert_eq!(report.evaluation.as_ref().unwrap().competencies.len(), 6);
    assert!(report.advanced());
}

/// Test: Complexity hints
/// Given a short answer that assesses as LOW
/// When the caller hints HIGH, and then sends an unknown label
/// Then the hint reroutes to STEP_BACK, and the unknown label is ignored
#[tokio::test]
async fn test_complexity_hints_reroute_or_are_ignored() {
    let provider = Arc::new(ScriptedProvider::uniform(2.0));
    let (service, mut rx) = service_with(Arc::clone(&provider));
    start(&service, &mut rx, "s1");

    let report = service
        .handle_request(EvaluationRequest::new("s1", SHORT_ANSWER).with_complexity_hint("high"))
        .await
        .unwrap();
    assert_eq!(report.complexity, ComplexityLevel::High);
    assert_eq!(report.strategy, ReasoningStrategy::StepBack);
    assert!(report.routing_overridden);
    assert_eq!(report.evaluation.as_ref().unwrap().competencies.len(), 9);

    let report = service
        .handle_request(
            EvaluationRequest::new("s1", OTHER_SHORT_ANSWER).with_complexity_hint("extreme"),
        )
        .await
        .unwrap();
    assert_eq!(report.complexity, ComplexityLevel::Low);
    assert_eq!(report.strategy, ReasoningStrategy::Lean);
    assert!(!report.routing_overridden);
}
