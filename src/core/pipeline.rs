//! Pipeline domain model

use crate::core::{
    state::{PipelineStatus, StageStatus},
    step::StageRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Issue and planning linkage for a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    #[serde(default)]
    pub issue_refs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_id: Option<String>,
}

/// An artifact produced by a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,

    /// Where the artifact was written, if it is a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ArtifactRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn at(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }
}

/// Per-position execution record of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExecutionState {
    pub stage_ref: StageRef,

    pub state: StageStatus,

    /// Artifacts produced by this stage
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Id of the captured execution result, if the executor ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

impl StageExecutionState {
    pub fn pending(stage_ref: StageRef) -> Self {
        Self {
            stage_ref,
            state: StageStatus::Pending,
            artifacts: Vec::new(),
            human_approved_at: None,
            started_at: None,
            completed_at: None,
            history_id: None,
        }
    }

    /// Enter the active state. Leftovers from an interrupted attempt are discarded.
    pub fn start(&mut self) {
        self.state = StageStatus::Active;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.artifacts.clear();
        self.history_id = None;
    }

    pub fn complete(&mut self) {
        self.finish(StageStatus::Complete);
    }

    pub fn fail(&mut self) {
        self.finish(StageStatus::Failed);
    }

    pub fn skip(&mut self) {
        self.finish(StageStatus::Skipped);
    }

    fn finish(&mut self, state: StageStatus) {
        self.state = state;
        self.completed_at = Some(Utc::now());
    }
}

/// The unit of persistence and resumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub pipeline_type: String,

    pub stages: Vec<StageExecutionState>,

    pub state: PipelineStatus,

    pub current_stage_index: usize,

    #[serde(default)]
    pub metadata: PipelineMetadata,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    /// Create a draft pipeline with every stage pending
    pub fn new(
        name: impl Into<String>,
        pipeline_type: impl Into<String>,
        stages: Vec<StageRef>,
        metadata: PipelineMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            pipeline_type: pipeline_type.into(),
            stages: stages.into_iter().map(StageExecutionState::pending).collect(),
            state: PipelineStatus::Draft,
            current_stage_index: 0,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get a mutable stage by index
    pub fn stage_mut(&mut self, index: usize) -> Option<&mut StageExecutionState> {
        self.stages.get_mut(index)
    }

    /// Number of stages that reached `complete`
    pub fn stages_completed(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.state == StageStatus::Complete)
            .count()
    }

    /// Move the stage cursor forward. It never moves back.
    pub fn advance_to(&mut self, index: usize) {
        if index > self.current_stage_index {
            self.current_stage_index = index;
        }
    }

    /// Record an update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
