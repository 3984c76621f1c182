//! Persistence layer: pipeline snapshots, captured results and token usage

pub mod history;
pub mod store;
pub mod usage;

pub use history::JsonHistoryStore;
pub use store::JsonPipelineStore;
pub use usage::JsonUsageLedger;

use crate::agent::TokenUsage;
use crate::core::Pipeline;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for pipeline persistence backends
#[async_trait::async_trait]
pub trait PipelineStore: Send + Sync {
    /// Save the whole pipeline, replacing any earlier snapshot
    async fn write(&self, pipeline: &Pipeline) -> Result<()>;

    /// Load a pipeline by id; fails if it does not exist
    async fn read(&self, id: &str) -> Result<Pipeline>;

    async fn exists(&self, id: &str) -> Result<bool>;

    /// List all stored pipelines, oldest first
    async fn list(&self) -> Result<Vec<Pipeline>>;
}

/// What the runner hands to the result capturer after an adapter call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInput {
    pub pipeline_id: String,
    pub stage_index: usize,
    pub step_type: String,
    pub success: bool,
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub completed_at: DateTime<Utc>,
}

/// A captured execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResult {
    pub id: String,
    #[serde(flatten)]
    pub input: CaptureInput,
    pub captured_at: DateTime<Utc>,
}

impl CapturedResult {
    fn from_input(input: CaptureInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            input,
            captured_at: Utc::now(),
        }
    }
}

/// Records executor results into run history
#[async_trait::async_trait]
pub trait ResultCapturer: Send + Sync {
    async fn capture(&self, input: CaptureInput) -> Result<CapturedResult>;
}

/// Accumulates token usage per stage
#[async_trait::async_trait]
pub trait TokenTracker: Send + Sync {
    async fn record_usage(&self, key: &str, usage: &TokenUsage) -> Result<()>;
}

/// Composite usage key identifying one stage of one pipeline
pub fn usage_key(pipeline_id: &str, stage_index: usize) -> String {
    format!("{}:{}", pipeline_id, stage_index)
}

/// Write a JSON document via a temporary file and rename
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// In-memory pipeline store (for testing or ephemeral use)
#[derive(Default)]
pub struct InMemoryPipelineStore {
    pipelines: RwLock<HashMap<String, Pipeline>>,
    writes: RwLock<usize>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots written so far
    pub async fn write_count(&self) -> usize {
        *self.writes.read().await
    }
}

#[async_trait::async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn write(&self, pipeline: &Pipeline) -> Result<()> {
        self.pipelines
            .write()
            .await
            .insert(pipeline.id.clone(), pipeline.clone());
        *self.writes.write().await += 1;
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Pipeline> {
        self.pipelines
            .read()
            .await
            .get(id)
            .cloned()
            .with_context(|| format!("Pipeline {} not found", id))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.pipelines.read().await.contains_key(id))
    }

    async fn list(&self) -> Result<Vec<Pipeline>> {
        let mut pipelines: Vec<Pipeline> = self.pipelines.read().await.values().cloned().collect();
        pipelines.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pipelines)
    }
}

/// In-memory result history
#[derive(Default)]
pub struct InMemoryHistory {
    results: RwLock<Vec<CapturedResult>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self) -> Vec<CapturedResult> {
        self.results.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ResultCapturer for InMemoryHistory {
    async fn capture(&self, input: CaptureInput) -> Result<CapturedResult> {
        let captured = CapturedResult::from_input(input);
        self.results.write().await.push(captured.clone());
        Ok(captured)
    }
}

/// In-memory token tracker
#[derive(Default)]
pub struct InMemoryUsageTracker {
    usage: RwLock<HashMap<String, TokenUsage>>,
}

impl InMemoryUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn usage(&self, key: &str) -> Option<TokenUsage> {
        self.usage.read().await.get(key).copied()
    }
}

#[async_trait::async_trait]
impl TokenTracker for InMemoryUsageTracker {
    async fn record_usage(&self, key: &str, usage: &TokenUsage) -> Result<()> {
        let mut all = self.usage.write().await;
        let entry = all.entry(key.to_string()).or_default();
        *entry = entry.add(usage);
        Ok(())
    }
}
