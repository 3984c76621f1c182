//! Test: Learnings - injected into manifests and captured after stages

use crate::helpers::*;
use chrono::Utc;
use stagecraft::core::{
    Gate, GateCondition, Learning, LearningTier, StageStatus, StepDefinition,
};
use stagecraft::execution::{ExecutionEvent, GateDecision, LEARNINGS_HEADING};
use stagecraft::knowledge::InMemoryKnowledgeStore;
use std::sync::Arc;

fn learning(id: &str, step_type: Option<&str>, channels: &[&str]) -> Learning {
    Learning {
        id: id.to_string(),
        tier: LearningTier::Step,
        category: "build".to_string(),
        content: format!("Learning {}", id),
        confidence: 0.8,
        evidence: vec![],
        step_type: step_type.map(str::to_string),
        channels: channels.iter().map(|c| c.to_string()).collect(),
        created_at: Utc::now(),
    }
}

/// Stage learnings come first, subscribed ones follow without duplicates
#[tokio::test]
async fn test_learnings_injected_into_manifest() {
    let harness = Harness::new(vec![producing("build", &[])]).with_knowledge(
        InMemoryKnowledgeStore::with_learnings(vec![
            learning("shared", Some("build"), &["default"]),
            learning("stage-only", Some("build"), &[]),
            learning("channel-only", None, &["default"]),
            learning("other-channel", None, &["team"]),
            learning("other-stage", Some("research"), &[]),
        ]),
    );
    let mut pipeline = pipeline(&["build"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    let calls = harness.adapter.calls();
    assert_eq!(calls.len(), 1);
    let ids: Vec<&str> = calls[0].learnings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["shared", "stage-only", "channel-only"]);
    assert!(calls[0].prompt.contains(LEARNINGS_HEADING));
    assert!(calls[0].prompt.contains("Learning stage-only"));
    assert!(!calls[0].prompt.contains("Learning other-stage"));
}

/// The subscription channel is configurable
#[tokio::test]
async fn test_custom_subscription_channel() {
    let harness = Harness::new(vec![producing("build", &[])]).with_knowledge(
        InMemoryKnowledgeStore::with_learnings(vec![
            learning("default-only", None, &["default"]),
            learning("team-only", None, &["team"]),
        ]),
    );
    let mut pipeline = pipeline(&["build"]);

    harness
        .runner()
        .with_subscription("team")
        .run(&mut pipeline)
        .await
        .unwrap();

    let ids: Vec<String> = harness.adapter.calls()[0]
        .learnings
        .iter()
        .map(|l| l.id.clone())
        .collect();
    assert_eq!(ids, vec!["team-only".to_string()]);
}

/// Without learnings the prompt carries no learnings section
#[tokio::test]
async fn test_no_learnings_section_when_empty() {
    let harness = Harness::new(vec![producing("build", &[])]);
    let mut pipeline = pipeline(&["build"]);

    harness.runner().run(&mut pipeline).await.unwrap();

    let manifest = &harness.adapter.calls()[0];
    assert!(manifest.learnings.is_empty());
    assert!(!manifest.prompt.contains(LEARNINGS_HEADING));
}

/// Content returned by the hook is stored as a stage-tier learning
#[tokio::test]
async fn test_hook_learning_captured() {
    let harness = Harness::new(vec![producing("research", &["notes"]), producing("build", &[])]);
    let hook = Arc::new(ScriptedHook::deciding(None).with_learning("Cache the dependency tree"));
    let mut pipeline = pipeline(&["research", "build"]);

    harness
        .runner()
        .with_hook(hook)
        .run(&mut pipeline)
        .await
        .unwrap();

    let stored = harness.knowledge.all().await;
    assert_eq!(stored.len(), 2);
    for (learning, step_type) in stored.iter().zip(["research", "build"]) {
        assert_eq!(learning.tier, LearningTier::Stage);
        assert_eq!(learning.category, step_type);
        assert_eq!(learning.step_type.as_deref(), Some(step_type));
        assert_eq!(learning.content, "Cache the dependency tree");
    }

    let captured: Vec<usize> = harness
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ExecutionEvent::LearningCaptured { stage_index, .. } => Some(stage_index),
            _ => None,
        })
        .collect();
    assert_eq!(captured, vec![0, 1]);
}

/// A learning captured by one stage reaches later stages of the same type
#[tokio::test]
async fn test_captured_learning_feeds_later_stage() {
    let harness = Harness::new(vec![producing("build", &[])]);
    let hook = Arc::new(ScriptedHook::deciding(None).with_learning("Run the fast suite first"));
    let mut pipeline = pipeline(&["build", "build"]);

    harness
        .runner()
        .with_hook(hook)
        .run(&mut pipeline)
        .await
        .unwrap();

    let calls = harness.adapter.calls();
    assert!(calls[0].learnings.is_empty());
    assert_eq!(calls[1].learnings.len(), 1);
    assert_eq!(calls[1].learnings[0].content, "Run the fast suite first");
}

/// Aborted stages still get a chance to record what went wrong
#[tokio::test]
async fn test_learning_captured_on_abort() {
    let harness = Harness::new(vec![StepDefinition::new("release")
        .with_entry_gate(Gate::entry(vec![GateCondition::human_approved()]))]);
    let hook = Arc::new(
        ScriptedHook::deciding(Some(GateDecision::Abort)).with_learning("Ask for approval early"),
    );
    let mut pipeline = pipeline(&["release"]);

    let result = harness
        .runner()
        .with_hook(hook)
        .run(&mut pipeline)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(pipeline.stages[0].state, StageStatus::Failed);
    let stored = harness.knowledge.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "Ask for approval early");
    assert_eq!(stored[0].step_type.as_deref(), Some("release"));
}
