//! stagecraft - gated, resumable multi-stage pipelines

pub mod agent;
pub mod cli;
pub mod core;
pub mod execution;
pub mod knowledge;
pub mod persistence;
pub mod refs;
pub mod registry;
pub mod validation;

// Re-export commonly used types
pub use agent::{AdapterError, CommandAdapter, ExecutionResult, StepAdapter, TokenUsage};
pub use core::{Flavor, Gate, GateCondition, Pipeline, PipelineStatus, StageStatus, StepDefinition};
pub use execution::{Collaborators, ExecutionEvent, Manifest, ManifestBuilder, PipelineRunner, RunResult, RunnerError};
pub use registry::{FlavorRegistry, StepRegistry, StepResolver};
pub use validation::{validate_flavor, FlavorValidation};
