//! Test: Persistence - checkpoints and file-backed collaborators

use crate::helpers::*;
use stagecraft::agent::ExecutionResult;
use stagecraft::core::{
    Gate, GateCondition, LearningTier, PipelineStatus, StageStatus, StepDefinition,
};
use stagecraft::execution::{Collaborators, GateDecision, PipelineRunner, RunnerError};
use stagecraft::knowledge::JsonKnowledgeStore;
use stagecraft::persistence::{
    usage_key, JsonHistoryStore, JsonPipelineStore, JsonUsageLedger, PipelineStore,
};
use std::sync::Arc;

/// Activation, every stage start and every stage settlement and the finish are checkpointed
#[tokio::test]
async fn test_checkpoint_after_every_transition() {
    let harness = Harness::new(vec![producing("research", &[]), producing("build", &[])]);
    let mut pipeline = pipeline(&["research", "build"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    // 1 activation + 2 x (start + settle) + 1 finish
    assert_eq!(harness.store.write_count().await, 6);
    assert_eq!(harness.store.read(&pipeline.id).await.unwrap(), pipeline);
}

/// An aborted run leaves the abandoned snapshot behind
#[tokio::test]
async fn test_abort_is_persisted() {
    let harness = Harness::new(vec![StepDefinition::new("release")
        .with_entry_gate(Gate::entry(vec![GateCondition::human_approved()]))]);
    let mut pipeline = pipeline(&["release"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    // 1 activation + start + settle
    assert_eq!(harness.store.write_count().await, 3);
    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored.state, PipelineStatus::Abandoned);
    assert_eq!(stored.stages[0].state, StageStatus::Failed);
}

/// A full run against the JSON stores can be reloaded from disk
#[tokio::test]
async fn test_run_with_json_stores() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let store = Arc::new(JsonPipelineStore::new(root.join("pipelines")));
    let history = Arc::new(JsonHistoryStore::new(root.join("history")));
    let tokens = Arc::new(JsonUsageLedger::new(root.join("usage.json")));
    let knowledge = Arc::new(JsonKnowledgeStore::new(root.join("knowledge.json")));

    let harness = Harness::new(vec![producing("research", &["notes"]), producing("build", &["build-report"])])
        .with_adapter(MockAdapter::new().with_result(
            "build",
            ExecutionResult::succeeded(vec![]).with_token_usage(usage(900, 100)),
        ));
    let hook = Arc::new(ScriptedHook::deciding(None).with_learning("Keep notes short"));

    let runner = PipelineRunner::new(Collaborators {
        steps: harness.steps.clone(),
        adapter: harness.adapter.clone(),
        store: store.clone(),
        knowledge: knowledge.clone(),
        tokens: tokens.clone(),
        history: history.clone(),
    })
    .with_hook(hook);

    let mut pipeline = pipeline(&["research", "build"]);
    let result = runner.run(&mut pipeline).await.unwrap();
    assert!(result.success);

    let reopened = JsonPipelineStore::new(root.join("pipelines"));
    assert!(reopened.exists(&pipeline.id).await.unwrap());
    let stored = reopened.read(&pipeline.id).await.unwrap();
    assert_eq!(stored, pipeline);
    assert_eq!(reopened.list().await.unwrap().len(), 1);

    let results = JsonHistoryStore::new(root.join("history"))
        .load_for_pipeline(&pipeline.id)
        .await
        .unwrap();
    let ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, result.history_ids);
    assert_eq!(results[0].input.artifacts, vec!["notes".to_string()]);
    assert_eq!(results[1].input.step_type, "build");

    let ledger = JsonUsageLedger::new(root.join("usage.json"));
    let recorded = ledger.usage(&usage_key(&pipeline.id, 1)).await.unwrap().unwrap();
    assert_eq!(recorded.total(), 1000);
    assert!(ledger.usage(&usage_key(&pipeline.id, 0)).await.unwrap().is_none());

    let learnings = JsonKnowledgeStore::new(root.join("knowledge.json"))
        .load_all()
        .await
        .unwrap();
    assert_eq!(learnings.len(), 2);
    assert!(learnings.iter().all(|l| l.tier == LearningTier::Stage));
}

/// A stored pipeline can be run by id
#[tokio::test]
async fn test_run_stored_pipeline() {
    let harness = Harness::new(vec![producing("research", &["notes"])]);
    let pipeline = pipeline(&["research"]);
    harness.store.write(&pipeline).await.unwrap();

    let result = harness.runner().run_stored(&pipeline.id).await.unwrap();

    assert!(result.success);
    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored.state, PipelineStatus::Complete);
    assert_eq!(stored.stages[0].state, StageStatus::Complete);
}

/// A failing learning capture cannot roll back the settled stage on disk
#[tokio::test]
async fn test_settled_state_survives_failed_learning_capture() {
    let harness = Harness::new(vec![StepDefinition::new("release")
        .with_entry_gate(Gate::entry(vec![GateCondition::human_approved()]))]);
    let hook = Arc::new(
        ScriptedHook::deciding(Some(GateDecision::Abort)).with_learning("Ask for approval early"),
    );
    let runner = PipelineRunner::new(Collaborators {
        steps: harness.steps.clone(),
        adapter: harness.adapter.clone(),
        store: harness.store.clone(),
        knowledge: Arc::new(BrokenKnowledgeStore),
        tokens: harness.tokens.clone(),
        history: harness.history.clone(),
    })
    .with_hook(hook);
    let mut pipeline = pipeline(&["release"]);

    let err = runner.run(&mut pipeline).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Collaborator {
            collaborator: "knowledge store",
            ..
        }
    ));

    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(stored.state, PipelineStatus::Abandoned);
    assert_eq!(stored.stages[0].state, StageStatus::Failed);

    // The abort is final, so nothing is executed again
    let mut reloaded = stored;
    let err = runner.run(&mut reloaded).await.unwrap_err();
    assert!(matches!(err, RunnerError::AlreadyFinished { .. }));
    assert!(harness.adapter.calls().is_empty());
}

/// A completed stage stays completed when its learning cannot be stored
#[tokio::test]
async fn test_completed_stage_not_rerun_after_failed_capture() {
    let harness = Harness::new(vec![producing("research", &["notes"]), producing("build", &[])]);
    let runner = PipelineRunner::new(Collaborators {
        steps: harness.steps.clone(),
        adapter: harness.adapter.clone(),
        store: harness.store.clone(),
        knowledge: Arc::new(BrokenKnowledgeStore),
        tokens: harness.tokens.clone(),
        history: harness.history.clone(),
    })
    .with_hook(Arc::new(ScriptedHook::deciding(None).with_learning("Note it")));
    let mut pipeline = pipeline(&["research", "build"]);

    assert!(runner.run(&mut pipeline).await.is_err());
    let stored = harness.store.read(&pipeline.id).await.unwrap();
    assert_eq!(
        stage_states(&stored),
        vec![StageStatus::Complete, StageStatus::Pending]
    );

    // Resuming without the hook only runs the remaining stage
    let resumed = harness.runner().run_stored(&pipeline.id).await.unwrap();
    assert!(resumed.success);
    assert_eq!(harness.adapter.executed_types(), vec!["research", "build"]);
}
