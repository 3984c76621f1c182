//! Command adapter - hands the manifest to an external program

use crate::agent::{AdapterConfig, AdapterError, AdapterOutput, ExecutionResult, StepAdapter};
use crate::execution::Manifest;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Adapter that spawns a program per stage
///
/// The manifest is written to the program's stdin as JSON. If stdout parses
/// as an [`AdapterOutput`] document it becomes the result; otherwise the exit
/// status decides `success` and no artifacts are reported.
#[derive(Debug, Clone)]
pub struct CommandAdapter {
    config: AdapterConfig,
    working_dir: Option<PathBuf>,
}

impl CommandAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.config.command
    }

    async fn run(&self, payload: Vec<u8>) -> Result<std::process::Output, AdapterError> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| AdapterError::Spawn {
            command: self.config.command.clone(),
            message: e.to_string(),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        Ok(child.wait_with_output().await?)
    }
}

#[async_trait]
impl StepAdapter for CommandAdapter {
    async fn execute(&self, manifest: &Manifest) -> Result<ExecutionResult, AdapterError> {
        let payload = serde_json::to_vec(manifest)
            .map_err(|e| AdapterError::Internal(format!("Failed to encode manifest: {}", e)))?;

        debug!(
            "Spawning adapter '{}' for stage {} ({} byte manifest)",
            self.config.command,
            manifest.stage_type,
            payload.len()
        );

        let output = timeout(Duration::from_secs(self.config.timeout_secs), self.run(payload))
            .await
            .map_err(|_| AdapterError::Timeout(self.config.timeout_secs))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "Adapter exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        match serde_json::from_slice::<AdapterOutput>(&output.stdout) {
            Ok(parsed) => Ok(parsed.into()),
            Err(e) => {
                debug!("Adapter stdout is not a result document: {}", e);
                Ok(ExecutionResult {
                    success: output.status.success(),
                    artifacts: Vec::new(),
                    token_usage: None,
                    completed_at: Utc::now(),
                })
            }
        }
    }
}
