//! Knowledge store: learnings captured from earlier executions

pub mod store;

pub use store::JsonKnowledgeStore;

use crate::core::{Learning, LearningInput};
use anyhow::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Confidence given to a captured learning that did not state one
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Source and sink of learnings
#[async_trait::async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Learnings attached to a step type
    async fn load_for_stage(&self, step_type: &str) -> Result<Vec<Learning>>;

    /// Learnings published on a subscription channel
    async fn load_for_subscriptions(&self, channel: &str) -> Result<Vec<Learning>>;

    /// Persist a new learning
    async fn capture(&self, input: LearningInput) -> Result<Learning>;
}

/// Turn capture input into a stored learning
pub(crate) fn new_learning(input: LearningInput) -> Learning {
    Learning {
        id: Uuid::new_v4().to_string(),
        tier: input.tier,
        category: input.category,
        content: input.content,
        confidence: input.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
        evidence: Vec::new(),
        step_type: input.stage_type,
        channels: Vec::new(),
        created_at: Utc::now(),
    }
}

pub(crate) fn for_stage(learnings: &[Learning], step_type: &str) -> Vec<Learning> {
    learnings
        .iter()
        .filter(|l| l.step_type.as_deref() == Some(step_type))
        .cloned()
        .collect()
}

pub(crate) fn for_channel(learnings: &[Learning], channel: &str) -> Vec<Learning> {
    learnings
        .iter()
        .filter(|l| l.channels.iter().any(|c| c == channel))
        .cloned()
        .collect()
}

/// In-memory knowledge store
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    learnings: RwLock<Vec<Learning>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing learnings
    pub fn with_learnings(learnings: Vec<Learning>) -> Self {
        Self {
            learnings: RwLock::new(learnings),
        }
    }

    pub async fn all(&self) -> Vec<Learning> {
        self.learnings.read().await.clone()
    }
}

#[async_trait::async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn load_for_stage(&self, step_type: &str) -> Result<Vec<Learning>> {
        Ok(for_stage(&self.learnings.read().await, step_type))
    }

    async fn load_for_subscriptions(&self, channel: &str) -> Result<Vec<Learning>> {
        Ok(for_channel(&self.learnings.read().await, channel))
    }

    async fn capture(&self, input: LearningInput) -> Result<Learning> {
        let learning = new_learning(input);
        self.learnings.write().await.push(learning.clone());
        Ok(learning)
    }
}
