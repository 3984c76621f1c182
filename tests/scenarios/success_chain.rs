//! Test: Success Chain - stages run in order and feed each other's gates

use crate::helpers::*;
use stagecraft::agent::{ExecutionResult, TokenUsage};
use stagecraft::core::{ArtifactRecord, Gate, GateCondition, PipelineStatus, StageStatus, StepDefinition};
use stagecraft::execution::ExecutionEvent;
use stagecraft::persistence::{usage_key, PipelineStore};

/// Without gates every stage completes and is captured once
#[tokio::test]
async fn test_pipeline_without_gates() {
    let harness = Harness::new(vec![
        producing("research", &["notes"]),
        producing("plan", &["plan"]),
        producing("build", &["build-report"]),
    ]);
    let mut pipeline = pipeline(&["research", "plan", "build"]);

    let result = harness.runner().run(&mut pipeline).await.unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 3);
    assert_eq!(result.stages_total, 3);
    assert_eq!(result.aborted_at, None);
    assert_eq!(result.history_ids.len(), 3);
    assert_eq!(harness.history.results().await.len(), 3);
    assert_eq!(harness.adapter.executed_types(), vec!["research", "plan", "build"]);

    assert_eq!(pipeline.state, PipelineStatus::Complete);
    assert_eq!(pipeline.current_stage_index, 3);
    assert_eq!(
        stage_states(&pipeline),
        vec![StageStatus::Complete, StageStatus::Complete, StageStatus::Complete]
    );
    for (stage, history_id) in pipeline.stages.iter().zip(&result.history_ids) {
        assert_eq!(stage.history_id.as_ref(), Some(history_id));
        assert!(stage.started_at.is_some());
        assert!(stage.completed_at.is_some());
    }
    assert_eq!(pipeline.stages[1].artifacts, vec![ArtifactRecord::named("plan")]);
}

/// A predecessor-complete gate passes once the earlier stage completed
#[tokio::test]
async fn test_predecessor_chain() {
    let harness = Harness::new(vec![
        producing("research", &["notes"]),
        StepDefinition::new("plan")
            .with_entry_gate(Gate::entry(vec![GateCondition::predecessor_complete("research")])),
    ]);
    let mut pipeline = pipeline(&["research", "plan"]);

    let result = harness.runner().run(&mut pipeline).await.unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 2);
    assert_eq!(
        stage_states(&pipeline),
        vec![StageStatus::Complete, StageStatus::Complete]
    );
}

/// Artifacts of earlier stages, and of the current stage for exit gates, are visible
#[tokio::test]
async fn test_artifacts_flow_into_gates() {
    let harness = Harness::new(vec![
        producing("plan", &["plan"]),
        producing("build", &["build-report"])
            .with_entry_gate(Gate::entry(vec![GateCondition::artifact_exists("plan")]))
            .with_exit_gate(Gate::exit(vec![
                GateCondition::artifact_exists("plan"),
                GateCondition::artifact_exists("build-report"),
            ])),
    ]);
    let mut pipeline = pipeline(&["plan", "build"]);

    let result = harness.runner().run(&mut pipeline).await.unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 2);
    let gate_failures = harness
        .events()
        .into_iter()
        .filter(|e| matches!(e, ExecutionEvent::GateFailed { .. }))
        .count();
    assert_eq!(gate_failures, 0);
}

/// A failed adapter result is recorded but the gates decide the outcome
#[tokio::test]
async fn test_adapter_failure_does_not_decide_outcome() {
    let failed = ExecutionResult {
        success: false,
        ..ExecutionResult::succeeded(vec![ArtifactRecord::named("notes")])
    };
    let harness = Harness::new(vec![producing("research", &["notes"])])
        .with_adapter(MockAdapter::new().with_result("research", failed));
    let mut pipeline = pipeline(&["research"]);

    let result = harness.runner().run(&mut pipeline).await.unwrap();

    assert!(result.success);
    assert_eq!(pipeline.stages[0].state, StageStatus::Complete);
    assert!(!harness.history.results().await[0].input.success);
}

/// Token usage is forwarded under `<pipeline id>:<stage index>`
#[tokio::test]
async fn test_token_usage_recorded_per_stage() {
    let harness = Harness::new(vec![producing("research", &[]), producing("build", &[])]).with_adapter(
        MockAdapter::new().with_result(
            "build",
            ExecutionResult::succeeded(vec![]).with_token_usage(usage(1200, 300)),
        ),
    );
    let mut pipeline = pipeline(&["research", "build"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    assert_eq!(harness.tokens.usage(&usage_key(&pipeline.id, 0)).await, None);
    let recorded: TokenUsage = harness
        .tokens
        .usage(&usage_key(&pipeline.id, 1))
        .await
        .unwrap();
    assert_eq!(recorded.total(), 1500);
    assert_eq!(recorded, usage(1200, 300));

    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored, pipeline);
}

/// Events arrive in lifecycle order
#[tokio::test]
async fn test_event_sequence() {
    let harness = Harness::new(vec![producing("research", &["notes"])]);
    let mut pipeline = pipeline(&["research"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    let events = harness.events();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], ExecutionEvent::PipelineStarted { stages_total: 1, .. }));
    assert!(matches!(events[1], ExecutionEvent::StageStarted { stage_index: 0, .. }));
    match &events[2] {
        ExecutionEvent::StageCompleted {
            stage_index,
            artifacts,
        } => {
            assert_eq!(*stage_index, 0);
            assert_eq!(artifacts, &vec!["notes".to_string()]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        events[3],
        ExecutionEvent::PipelineFinished {
            state: PipelineStatus::Complete,
            ..
        }
    ));
}
