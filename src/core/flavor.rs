//! Flavor model - a named composition of steps for one stage category

use crate::core::step::StepResources;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One step slot inside a flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorStep {
    /// Name of the slot, used as the override key
    pub step_name: String,

    /// Step type to resolve
    pub step_type: String,

    /// Optional step flavor qualifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_flavor: Option<String>,
}

impl FlavorStep {
    pub fn new(step_name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            step_type: step_type.into(),
            step_flavor: None,
        }
    }
}

/// Per-step field overrides declared by a flavor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// A named, ordered composition of steps guaranteeing a synthesis artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub name: String,

    pub stage_category: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<FlavorStep>,

    /// Artifact the composition must guarantee is produced
    pub synthesis_artifact: String,

    /// Flavor-level resource additions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<StepResources>,

    /// Overrides keyed by step name
    #[serde(default)]
    pub overrides: BTreeMap<String, StepOverride>,
}

impl Flavor {
    pub fn new(
        stage_category: impl Into<String>,
        name: impl Into<String>,
        steps: Vec<FlavorStep>,
        synthesis_artifact: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stage_category: stage_category.into(),
            description: String::new(),
            steps,
            synthesis_artifact: synthesis_artifact.into(),
            resources: None,
            overrides: BTreeMap::new(),
        }
    }

    /// Check whether the composition contains a step slot with this name
    pub fn has_step(&self, step_name: &str) -> bool {
        self.steps.iter().any(|s| s.step_name == step_name)
    }

    /// Override keys that do not name a step in the composition
    pub fn unmatched_override_keys(&self) -> Vec<&str> {
        self.overrides
            .keys()
            .filter(|key| !self.has_step(key))
            .map(String::as_str)
            .collect()
    }
}
