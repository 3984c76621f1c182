//! Execution state models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Created but never run
    Draft,
    /// A run has started and not finished
    Active,
    /// The walk reached the end without an abort (some stages may be skipped)
    Complete,
    /// A required gate failed and the run was aborted
    Abandoned,
}

impl PipelineStatus {
    /// Check if the pipeline can no longer be run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Complete | PipelineStatus::Abandoned)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Draft => "draft",
            PipelineStatus::Active => "active",
            PipelineStatus::Complete => "complete",
            PipelineStatus::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// State of a single stage within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Not reached yet
    Pending,
    /// Currently being processed
    Active,
    /// Both gates passed
    Complete,
    /// Stopped by an aborting gate
    Failed,
    /// Deliberately not executed, or executed but not accepted
    Skipped,
}

impl StageStatus {
    /// Check if stage is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Complete | StageStatus::Failed | StageStatus::Skipped
        )
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Pending => "pending",
            StageStatus::Active => "active",
            StageStatus::Complete => "complete",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
