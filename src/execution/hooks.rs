//! Override hook - the runner's only interactive extension point

use crate::core::{GateCondition, GateType, StageStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with a stage whose required gate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Skip,
    Abort,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Skip => f.write_str("skip"),
            GateDecision::Abort => f.write_str("abort"),
        }
    }
}

/// Passed to [`OverrideHook::gate_override`]
#[derive(Debug, Clone)]
pub struct GateOverrideContext {
    pub pipeline_id: String,
    pub stage_index: usize,
    pub step_type: String,
    pub gate_type: GateType,
    pub failed_conditions: Vec<GateCondition>,
}

/// Passed to [`OverrideHook::capture_learning`] once a stage is settled
#[derive(Debug, Clone)]
pub struct LearningCaptureContext {
    pub pipeline_id: String,
    pub stage_index: usize,
    pub step_type: String,
    pub outcome: StageStatus,
}

/// Optional strategy consulted by the runner.
///
/// Both operations default to "no answer": a gate failure without a decision
/// aborts the pipeline, and no learning is captured.
#[async_trait]
pub trait OverrideHook: Send + Sync {
    async fn gate_override(&self, _context: &GateOverrideContext) -> Option<GateDecision> {
        None
    }

    async fn capture_learning(&self, _context: &LearningCaptureContext) -> Option<String> {
        None
    }
}

/// Non-interactive hook that answers every gate failure the same way
#[derive(Debug, Clone, Copy)]
pub struct PolicyOverride {
    decision: GateDecision,
}

impl PolicyOverride {
    pub fn new(decision: GateDecision) -> Self {
        Self { decision }
    }
}

#[async_trait]
impl OverrideHook for PolicyOverride {
    async fn gate_override(&self, _context: &GateOverrideContext) -> Option<GateDecision> {
        Some(self.decision)
    }
}
