//! Adapter result types

use crate::core::ArtifactRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Failed to spawn adapter '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Adapter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token usage reported by an adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Sum two usage records, saturating at `u64::MAX`
    pub fn add(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
        }
    }
}

/// Outcome of one adapter invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,

    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// A successful result producing the given artifacts
    pub fn succeeded(artifacts: Vec<ArtifactRecord>) -> Self {
        Self {
            success: true,
            artifacts,
            token_usage: None,
            completed_at: Utc::now(),
        }
    }

    pub fn with_token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }
}

/// What a command adapter prints on stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterOutput {
    pub success: bool,

    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,

    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
}

impl From<AdapterOutput> for ExecutionResult {
    fn from(output: AdapterOutput) -> Self {
        Self {
            success: output.success,
            artifacts: output.artifacts,
            token_usage: output.token_usage,
            completed_at: Utc::now(),
        }
    }
}
