//! JSON file result history

use crate::persistence::{write_json_atomic, CaptureInput, CapturedResult, ResultCapturer};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Writes each captured result to `<dir>/<result_id>.json`
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load every result captured for a pipeline, in stage order
    pub async fn load_for_pipeline(&self, pipeline_id: &str) -> Result<Vec<CapturedResult>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            let result: CapturedResult = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            if result.input.pipeline_id == pipeline_id {
                results.push(result);
            }
        }

        results.sort_by(|a, b| {
            a.input
                .stage_index
                .cmp(&b.input.stage_index)
                .then(a.captured_at.cmp(&b.captured_at))
        });
        Ok(results)
    }
}

#[async_trait::async_trait]
impl ResultCapturer for JsonHistoryStore {
    async fn capture(&self, input: CaptureInput) -> Result<CapturedResult> {
        let captured = CapturedResult::from_input(input);
        let path = self.dir.join(format!("{}.json", captured.id));
        write_json_atomic(&path, &captured).await?;
        debug!(
            "Captured result {} for stage {} of {}",
            captured.id, captured.input.stage_index, captured.input.pipeline_id
        );
        Ok(captured)
    }
}
