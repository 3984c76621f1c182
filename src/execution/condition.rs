//! Condition evaluator - one gate condition against the run state

use crate::core::{ArtifactRecord, GateCondition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the commands of `command-passes` conditions
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// True iff the command ran and exited successfully
    async fn passes(&self, command: &str, working_dir: &Path) -> bool;
}

/// Runs commands through `sh -c` with a timeout
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    timeout_secs: u64,
}

impl ShellCommandRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new(300)
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn passes(&self, command: &str, working_dir: &Path) -> bool {
        let mut child = Command::new("sh");
        child
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), child.status()).await {
            Ok(Ok(status)) => {
                debug!("Gate command `{}` exited with {}", command, status);
                status.success()
            }
            Ok(Err(e)) => {
                warn!("Failed to run gate command `{}`: {}", command, e);
                false
            }
            Err(_) => {
                warn!("Gate command `{}` timed out after {}s", command, self.timeout_secs);
                false
            }
        }
    }
}

/// What a condition can observe while a stage is being gated
pub struct RuntimeState<'a> {
    /// Artifacts accumulated by earlier stages plus the current one
    pub artifacts: HashMap<String, ArtifactRecord>,

    /// Step types already complete earlier in the pipeline
    pub completed_steps: &'a HashSet<String>,

    pub human_approved_at: Option<DateTime<Utc>>,

    /// Base for relative artifact paths and gate commands
    pub working_dir: PathBuf,

    pub commands: &'a dyn CommandRunner,
}

/// Evaluate one condition. Malformed data evaluates to not passed.
pub async fn evaluate_condition(condition: &GateCondition, state: &RuntimeState<'_>) -> bool {
    match condition {
        GateCondition::PredecessorComplete {
            predecessor_type, ..
        } => !predecessor_type.is_empty() && state.completed_steps.contains(predecessor_type),

        GateCondition::ArtifactExists { artifact_name, .. } => {
            !artifact_name.is_empty() && state.artifacts.contains_key(artifact_name)
        }

        GateCondition::SchemaValid { artifact_name, .. } => {
            match state
                .artifacts
                .get(artifact_name)
                .and_then(|artifact| artifact.path.as_deref())
            {
                Some(path) => parses_as_structured(&state.working_dir.join(path)).await,
                None => false,
            }
        }

        GateCondition::HumanApproved { .. } => state.human_approved_at.is_some(),

        GateCondition::CommandPasses { command, .. } => {
            if command.trim().is_empty() {
                return false;
            }
            state.commands.passes(command, &state.working_dir).await
        }
    }
}

/// True iff the file holds a JSON or YAML mapping or sequence
async fn parses_as_structured(path: &Path) -> bool {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("Cannot read {} for schema check: {}", path.display(), e);
            return false;
        }
    };

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) {
        return value.is_object() || value.is_array();
    }
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(&content),
        Ok(serde_yaml::Value::Mapping(_)) | Ok(serde_yaml::Value::Sequence(_))
    )
}
