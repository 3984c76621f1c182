//! Learnings kept in a single JSON array file

use crate::core::{Learning, LearningInput};
use crate::knowledge::{for_channel, for_stage, new_learning, KnowledgeStore};
use crate::persistence::write_json_atomic;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

pub struct JsonKnowledgeStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonKnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// All stored learnings; a missing file means none
    pub async fn load_all(&self) -> Result<Vec<Learning>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse learnings {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl KnowledgeStore for JsonKnowledgeStore {
    async fn load_for_stage(&self, step_type: &str) -> Result<Vec<Learning>> {
        Ok(for_stage(&self.load_all().await?, step_type))
    }

    async fn load_for_subscriptions(&self, channel: &str) -> Result<Vec<Learning>> {
        Ok(for_channel(&self.load_all().await?, channel))
    }

    async fn capture(&self, input: LearningInput) -> Result<Learning> {
        let _guard = self.lock.lock().await;
        let mut learnings = self.load_all().await?;
        let learning = new_learning(input);
        learnings.push(learning.clone());
        write_json_atomic(&self.path, &learnings).await?;
        debug!("Captured learning {} into {}", learning.id, self.path.display());
        Ok(learning)
    }
}
