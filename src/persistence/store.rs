//! JSON file pipeline store: one document per pipeline

use crate::core::Pipeline;
use crate::persistence::{write_json_atomic, PipelineStore};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pipeline store writing `<dir>/<id>.json`
pub struct JsonPipelineStore {
    dir: PathBuf,
}

impl JsonPipelineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            bail!("Invalid pipeline id '{}'", id);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait::async_trait]
impl PipelineStore for JsonPipelineStore {
    async fn write(&self, pipeline: &Pipeline) -> Result<()> {
        let path = self.path_for(&pipeline.id)?;
        write_json_atomic(&path, pipeline)
            .await
            .with_context(|| format!("Failed to save pipeline {}", pipeline.id))?;
        debug!("Saved pipeline {} to {}", pipeline.id, path.display());
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Pipeline> {
        let path = self.path_for(id)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Pipeline {} not found in {}", id, self.dir.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn list(&self) -> Result<Vec<Pipeline>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut pipelines = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let parsed = tokio::fs::read_to_string(&path)
                .await
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(serde_json::from_str::<Pipeline>(&content)?));
            match parsed {
                Ok(pipeline) => pipelines.push(pipeline),
                Err(e) => warn!("Skipping unreadable pipeline file {}: {}", path.display(), e),
            }
        }

        pipelines.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pipelines)
    }
}
