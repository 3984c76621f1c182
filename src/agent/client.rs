//! Adapter configuration

use serde::{Deserialize, Serialize};

/// Configuration for the command adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Program to spawn for every stage
    pub command: String,

    /// Arguments passed to the program; the manifest is written to stdin
    pub args: Vec<String>,

    /// Timeout for one stage in seconds
    pub timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            command: "stagecraft-agent".to_string(),
            args: Vec::new(),
            timeout_secs: 10800,
        }
    }
}

impl AdapterConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
