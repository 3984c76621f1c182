//! Step definition model

use crate::core::gate::Gate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Reference to a step by type and optional flavor qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageRef {
    #[serde(rename = "type")]
    pub step_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
}

impl StageRef {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            flavor: None,
        }
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.flavor {
            Some(flavor) => write!(f, "{}:{}", self.step_type, flavor),
            None => f.write_str(&self.step_type),
        }
    }
}

/// A named output a step is expected to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepArtifact {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepArtifact {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            extension: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }
}

/// A tool the executor may want to use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHint {
    pub name: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// A sub-agent the executor may delegate to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

/// A skill the executor may load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillHint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

/// Resource hints attached to a step or a flavor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResources {
    #[serde(default)]
    pub tools: Vec<ToolHint>,
    #[serde(default)]
    pub agents: Vec<AgentHint>,
    #[serde(default)]
    pub skills: Vec<SkillHint>,
}

impl StepResources {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.agents.is_empty() && self.skills.is_empty()
    }

    /// Append every entry of `other` whose name is not already present.
    ///
    /// Existing entries always win on a name collision.
    pub fn merge_missing(&mut self, other: &StepResources) {
        append_missing(&mut self.tools, &other.tools, |t| &t.name);
        append_missing(&mut self.agents, &other.agents, |a| &a.name);
        append_missing(&mut self.skills, &other.skills, |s| &s.name);
    }
}

fn append_missing<T: Clone>(target: &mut Vec<T>, extra: &[T], name: fn(&T) -> &String) {
    let mut seen: HashSet<String> = target.iter().map(|item| name(item).clone()).collect();
    for item in extra {
        if seen.insert(name(item).clone()) {
            target.push(item.clone());
        }
    }
}

/// A reusable stage template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique key of the step
    #[serde(rename = "type")]
    pub step_type: String,

    /// Optional variant qualifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Artifacts this step produces, in declaration order
    #[serde(default)]
    pub artifacts: Vec<StepArtifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_gate: Option<Gate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_gate: Option<Gate>,

    /// Reference to a prompt template file, resolved relative to the templates directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<StepResources>,

    /// Event tags for knowledge capture
    #[serde(default)]
    pub learning_hooks: Vec<String>,

    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl StepDefinition {
    /// Create a bare step with no gates, artifacts or resources
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            flavor: None,
            description: String::new(),
            artifacts: Vec::new(),
            entry_gate: None,
            exit_gate: None,
            prompt_template: None,
            resources: None,
            learning_hooks: Vec::new(),
            config: HashMap::new(),
        }
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_artifact(mut self, artifact: StepArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_entry_gate(mut self, gate: Gate) -> Self {
        self.entry_gate = Some(gate);
        self
    }

    pub fn with_exit_gate(mut self, gate: Gate) -> Self {
        self.exit_gate = Some(gate);
        self
    }

    pub fn with_prompt_template(mut self, reference: impl Into<String>) -> Self {
        self.prompt_template = Some(reference.into());
        self
    }

    pub fn with_resources(mut self, resources: StepResources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// The reference that resolves to this definition
    pub fn stage_ref(&self) -> StageRef {
        StageRef {
            step_type: self.step_type.clone(),
            flavor: self.flavor.clone(),
        }
    }

    /// Names of the artifacts this step declares
    pub fn produced_artifacts(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.name.as_str())
    }
}
