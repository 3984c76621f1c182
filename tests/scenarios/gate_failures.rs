//! Test: Gate Failures - abort, skip and advisory handling

use crate::helpers::*;
use chrono::Utc;
use stagecraft::core::{Gate, GateCondition, GateType, PipelineStatus, StageStatus, StepDefinition};
use stagecraft::execution::{ExecutionEvent, GateDecision, PolicyOverride};
use stagecraft::persistence::PipelineStore;
use std::sync::Arc;

fn gated_on_research() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("plan")
            .with_entry_gate(Gate::entry(vec![GateCondition::predecessor_complete("research")])),
        producing("build", &["build-report"]),
    ]
}

/// An unmet entry gate without a hook abandons the pipeline before the adapter runs
#[tokio::test]
async fn test_entry_gate_failure_aborts_without_hook() {
    let harness = Harness::new(gated_on_research());
    let mut pipeline = pipeline(&["plan", "build"]);

    let result = harness.runner().run(&mut pipeline).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.aborted_at, Some(0));
    assert_eq!(result.stages_completed, 0);
    assert!(result.history_ids.is_empty());
    assert!(harness.history.results().await.is_empty());
    assert!(harness.adapter.calls().is_empty());

    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored.state, PipelineStatus::Abandoned);
    assert_eq!(
        stage_states(&stored),
        vec![StageStatus::Failed, StageStatus::Pending]
    );
    assert_eq!(stored.current_stage_index, 0);
}

/// A hook without an answer behaves like no hook
#[tokio::test]
async fn test_hook_without_decision_aborts() {
    let harness = Harness::new(gated_on_research());
    let hook = Arc::new(ScriptedHook::deciding(None));
    let mut pipeline = pipeline(&["plan", "build"]);

    let result = harness
        .runner()
        .with_hook(hook.clone())
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.aborted_at, Some(0));

    let calls = hook.gate_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].gate_type, GateType::Entry);
    assert_eq!(calls[0].step_type, "plan");
    assert_eq!(
        calls[0].failed_conditions,
        vec![GateCondition::predecessor_complete("research")]
    );
}

/// Skipping an entry gate never runs the stage but lets the pipeline finish
#[tokio::test]
async fn test_entry_gate_skip() {
    let harness = Harness::new(gated_on_research());
    let mut pipeline = pipeline(&["plan", "build"]);

    let result = harness
        .runner()
        .with_hook(Arc::new(PolicyOverride::new(GateDecision::Skip)))
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 1);
    assert_eq!(result.history_ids.len(), 1);
    assert_eq!(harness.adapter.executed_types(), vec!["build"]);

    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored.state, PipelineStatus::Complete);
    assert_eq!(
        stage_states(&stored),
        vec![StageStatus::Skipped, StageStatus::Complete]
    );
    assert!(stored.stages[0].history_id.is_none());
}

/// Skipping an exit gate keeps the captured result but not the completion
#[tokio::test]
async fn test_exit_gate_skip() {
    let harness = Harness::new(vec![
        StepDefinition::new("research")
            .with_exit_gate(Gate::exit(vec![GateCondition::artifact_exists("notes")])),
        StepDefinition::new("plan")
            .with_entry_gate(Gate::entry(vec![GateCondition::predecessor_complete("research")])),
    ]);
    let hook = Arc::new(ScriptedHook::deciding(Some(GateDecision::Skip)));
    let mut pipeline = pipeline(&["research", "plan"]);

    let result = harness
        .runner()
        .with_hook(hook.clone())
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 0);
    assert_eq!(harness.adapter.executed_types(), vec!["research"]);
    assert_eq!(harness.history.results().await.len(), 1);
    assert_eq!(result.history_ids.len(), 1);

    assert_eq!(
        stage_states(&pipeline),
        vec![StageStatus::Skipped, StageStatus::Skipped]
    );
    assert_eq!(pipeline.stages[0].history_id.as_ref(), Some(&result.history_ids[0]));

    // The skipped research stage never counts as a completed predecessor
    let gate_types: Vec<GateType> = hook.gate_calls().iter().map(|c| c.gate_type).collect();
    assert_eq!(gate_types, vec![GateType::Exit, GateType::Entry]);
}

/// Aborting at the exit gate fails the stage after the adapter ran
#[tokio::test]
async fn test_exit_gate_abort() {
    let harness = Harness::new(vec![
        producing("research", &["notes"]),
        StepDefinition::new("build")
            .with_exit_gate(Gate::exit(vec![GateCondition::artifact_exists("build-report")])),
        producing("review", &["review"]),
    ]);
    let mut pipeline = pipeline(&["research", "build", "review"]);

    let result = harness
        .runner()
        .with_hook(Arc::new(PolicyOverride::new(GateDecision::Abort)))
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.aborted_at, Some(1));
    assert_eq!(result.stages_completed, 1);
    assert_eq!(result.history_ids.len(), 2);
    assert_eq!(harness.adapter.executed_types(), vec!["research", "build"]);
    assert_eq!(pipeline.state, PipelineStatus::Abandoned);
    assert_eq!(
        stage_states(&pipeline),
        vec![StageStatus::Complete, StageStatus::Failed, StageStatus::Pending]
    );
}

/// An advisory gate reports its failures but never blocks
#[tokio::test]
async fn test_advisory_gate_does_not_block() {
    let harness = Harness::new(vec![StepDefinition::new("build").with_entry_gate(
        Gate::entry(vec![
            GateCondition::artifact_exists("design"),
            GateCondition::human_approved(),
        ])
        .advisory(),
    )]);
    let hook = Arc::new(ScriptedHook::deciding(Some(GateDecision::Abort)));
    let mut pipeline = pipeline(&["build"]);

    let result = harness
        .runner()
        .with_hook(hook.clone())
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stages_completed, 1);
    assert!(hook.gate_calls().is_empty());

    let advisory = harness.events().into_iter().find_map(|e| match e {
        ExecutionEvent::GateFailed {
            advisory,
            failed_conditions,
            ..
        } => Some((advisory, failed_conditions.len())),
        _ => None,
    });
    assert_eq!(advisory, Some((true, 2)));
}

/// Human approval recorded on the stage satisfies a human-approved gate
#[tokio::test]
async fn test_human_approval_gate() {
    let steps = vec![StepDefinition::new("release")
        .with_entry_gate(Gate::entry(vec![GateCondition::human_approved()]))];

    let unapproved = Harness::new(steps.clone());
    let mut pipeline_a = pipeline(&["release"]);
    let result = unapproved.runner().run(&mut pipeline_a).await.unwrap();
    assert!(!result.success);

    let approved = Harness::new(steps);
    let mut pipeline_b = pipeline(&["release"]);
    pipeline_b.stages[0].human_approved_at = Some(Utc::now());
    let result = approved.runner().run(&mut pipeline_b).await.unwrap();
    assert!(result.success);
    assert_eq!(pipeline_b.stages[0].state, StageStatus::Complete);
}

/// A command-passes gate runs through the configured command runner
#[tokio::test]
async fn test_command_gate() {
    let harness = Harness::new(vec![
        StepDefinition::new("check")
            .with_exit_gate(Gate::exit(vec![GateCondition::command_passes("true")])),
        StepDefinition::new("lint")
            .with_exit_gate(Gate::exit(vec![GateCondition::command_passes("exit 1")])),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(&["check", "lint"]);

    let result = harness
        .runner()
        .with_working_dir(dir.path())
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.aborted_at, Some(1));
    assert_eq!(
        stage_states(&pipeline),
        vec![StageStatus::Complete, StageStatus::Failed]
    );
}
