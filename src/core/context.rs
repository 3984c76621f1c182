//! Run accumulator - state threaded through the stage loop

use crate::core::{
    pipeline::{ArtifactRecord, Pipeline},
    state::StageStatus,
};
use std::collections::{HashMap, HashSet};

/// What earlier stages of a run have made available to later gates.
///
/// Artifacts and completed step types are only ever added, never removed.
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    /// Artifacts by name; a later record with the same name replaces the path
    artifacts: HashMap<String, ArtifactRecord>,

    /// Step types of stages that reached `complete`
    completed_steps: HashSet<String>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the accumulator from stages already completed by an earlier run
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut acc = Self::new();
        for stage in pipeline
            .stages
            .iter()
            .filter(|s| s.state == StageStatus::Complete)
        {
            acc.record_completed(&stage.stage_ref.step_type, &stage.artifacts);
        }
        acc
    }

    /// Add a completed stage's type and artifacts
    pub fn record_completed(&mut self, step_type: &str, artifacts: &[ArtifactRecord]) {
        self.completed_steps.insert(step_type.to_string());
        self.add_artifacts(artifacts);
    }

    fn add_artifacts(&mut self, artifacts: &[ArtifactRecord]) {
        for artifact in artifacts {
            self.artifacts.insert(artifact.name.clone(), artifact.clone());
        }
    }

    /// Artifacts visible to a gate, including ones the current stage just produced
    pub fn artifacts_with(&self, current: &[ArtifactRecord]) -> HashMap<String, ArtifactRecord> {
        let mut all = self.artifacts.clone();
        for artifact in current {
            all.insert(artifact.name.clone(), artifact.clone());
        }
        all
    }

    pub fn has_artifact(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub fn completed_steps(&self) -> &HashSet<String> {
        &self.completed_steps
    }
}
