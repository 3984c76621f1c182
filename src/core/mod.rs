//! Core domain models
//!
//! This module defines the data structures shared by the runner, the gate
//! evaluator, the manifest builder and the flavor validator: step
//! definitions, gates and their conditions, flavors, pipelines and their
//! per-stage execution state.

pub mod condition;
pub mod config;
pub mod context;
pub mod flavor;
pub mod gate;
pub mod learning;
pub mod pipeline;
pub mod state;
pub mod step;

pub use condition::GateCondition;
pub use context::RunAccumulator;
pub use flavor::{Flavor, FlavorStep, StepOverride};
pub use gate::{Gate, GateType};
pub use learning::{Evidence, Learning, LearningInput, LearningTier};
pub use pipeline::{ArtifactRecord, Pipeline, PipelineMetadata, StageExecutionState};
pub use state::{PipelineStatus, StageStatus};
pub use step::{AgentHint, SkillHint, StageRef, StepArtifact, StepDefinition, StepResources, ToolHint};
