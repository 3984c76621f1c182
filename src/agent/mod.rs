//! Step adapters - the pluggable executors that perform a stage's work

pub mod client;
pub mod command;
pub mod response;

use crate::execution::Manifest;
use async_trait::async_trait;
pub use client::AdapterConfig;
pub use command::CommandAdapter;
pub use response::{AdapterError, AdapterOutput, ExecutionResult, TokenUsage};

/// Trait for stage execution - allows for different implementations
///
/// The runner awaits this call and performs no other work while it is
/// pending; an implementation may take as long as the real work takes.
#[async_trait]
pub trait StepAdapter: Send + Sync {
    /// Perform the stage described by the manifest
    async fn execute(&self, manifest: &Manifest) -> Result<ExecutionResult, AdapterError>;
}
