//! Gate model

use crate::core::condition::GateCondition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a stage a gate guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Entry,
    Exit,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateType::Entry => f.write_str("entry"),
            GateType::Exit => f.write_str("exit"),
        }
    }
}

/// A checkpoint composed of conditions.
///
/// A non-required gate is advisory: its conditions are still evaluated and
/// reported, but never block the stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(rename = "type")]
    pub gate_type: GateType,

    #[serde(default)]
    pub conditions: Vec<GateCondition>,

    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Gate {
    /// Create a required entry gate
    pub fn entry(conditions: Vec<GateCondition>) -> Self {
        Self {
            gate_type: GateType::Entry,
            conditions,
            required: true,
        }
    }

    /// Create a required exit gate
    pub fn exit(conditions: Vec<GateCondition>) -> Self {
        Self {
            gate_type: GateType::Exit,
            conditions,
            required: true,
        }
    }

    /// Mark the gate as advisory
    pub fn advisory(mut self) -> Self {
        self.required = false;
        self
    }
}
