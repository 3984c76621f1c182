//! Gate condition model

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single predicate guarding a stage.
///
/// Serialized with an internal `type` tag, e.g.
/// `{"type": "artifact-exists", "artifact_name": "plan.md"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GateCondition {
    /// A step of this type must already be complete earlier in the pipeline
    PredecessorComplete {
        predecessor_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// The named artifact must be in the accumulated artifact set
    ArtifactExists {
        artifact_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// The named artifact must parse as structured data
    SchemaValid {
        artifact_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// The current stage must carry a human approval timestamp
    HumanApproved {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// An external command must exit successfully
    CommandPasses {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl GateCondition {
    pub fn predecessor_complete(step_type: impl Into<String>) -> Self {
        GateCondition::PredecessorComplete {
            predecessor_type: step_type.into(),
            description: None,
        }
    }

    pub fn artifact_exists(name: impl Into<String>) -> Self {
        GateCondition::ArtifactExists {
            artifact_name: name.into(),
            description: None,
        }
    }

    pub fn schema_valid(name: impl Into<String>) -> Self {
        GateCondition::SchemaValid {
            artifact_name: name.into(),
            description: None,
        }
    }

    pub fn human_approved() -> Self {
        GateCondition::HumanApproved { description: None }
    }

    pub fn command_passes(command: impl Into<String>) -> Self {
        GateCondition::CommandPasses {
            command: command.into(),
            description: None,
        }
    }

    /// The wire tag of this condition
    pub fn kind(&self) -> &'static str {
        match self {
            GateCondition::PredecessorComplete { .. } => "predecessor-complete",
            GateCondition::ArtifactExists { .. } => "artifact-exists",
            GateCondition::SchemaValid { .. } => "schema-valid",
            GateCondition::HumanApproved { .. } => "human-approved",
            GateCondition::CommandPasses { .. } => "command-passes",
        }
    }

    /// Optional human-readable description
    pub fn description(&self) -> Option<&str> {
        match self {
            GateCondition::PredecessorComplete { description, .. }
            | GateCondition::ArtifactExists { description, .. }
            | GateCondition::SchemaValid { description, .. }
            | GateCondition::HumanApproved { description }
            | GateCondition::CommandPasses { description, .. } => description.as_deref(),
        }
    }
}

impl fmt::Display for GateCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = self.description() {
            return f.write_str(description);
        }
        match self {
            GateCondition::PredecessorComplete { predecessor_type, .. } => {
                write!(f, "{}({})", self.kind(), predecessor_type)
            }
            GateCondition::ArtifactExists { artifact_name, .. }
            | GateCondition::SchemaValid { artifact_name, .. } => {
                write!(f, "{}({})", self.kind(), artifact_name)
            }
            GateCondition::HumanApproved { .. } => f.write_str(self.kind()),
            GateCondition::CommandPasses { command, .. } => {
                write!(f, "{}(`{}`)", self.kind(), command)
            }
        }
    }
}
