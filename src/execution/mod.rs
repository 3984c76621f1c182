//! Pipeline execution: condition and gate evaluation, manifest assembly and the runner

pub mod condition;
pub mod gate;
pub mod hooks;
pub mod manifest;
pub mod runner;

pub use condition::{evaluate_condition, CommandRunner, RuntimeState, ShellCommandRunner};
pub use gate::{evaluate_gate, GateResult};
pub use hooks::{GateDecision, GateOverrideContext, LearningCaptureContext, OverrideHook, PolicyOverride};
pub use manifest::{Manifest, ManifestBuilder, ManifestContext, LEARNINGS_HEADING, RESOURCES_HEADING};
pub use runner::{Collaborators, EventHandler, ExecutionEvent, PipelineRunner, RunResult, RunnerError};
