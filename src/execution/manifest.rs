//! Manifest builder - assembles the payload handed to the step adapter

use crate::core::{Gate, Learning, PipelineMetadata, StepArtifact, StepDefinition, StepResources};
use crate::refs::{FsRefResolver, RefResolutionError, RefResolver};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub const RESOURCES_HEADING: &str = "## Suggested Resources";
pub const LEARNINGS_HEADING: &str = "## Learnings from Previous Executions";

/// Where in which pipeline a manifest is executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestContext {
    pub pipeline_id: String,
    pub stage_index: usize,
    pub metadata: PipelineMetadata,
}

/// Self-contained execution payload for one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub stage_type: String,
    pub stage_flavor: Option<String>,
    pub prompt: String,
    pub context: ManifestContext,

    /// Gate definitions, carried for audit only
    pub entry_gate: Option<Gate>,
    pub exit_gate: Option<Gate>,

    pub artifacts: Vec<StepArtifact>,
    pub learnings: Vec<Learning>,
    pub resources: Option<StepResources>,
}

pub struct ManifestBuilder {
    templates_dir: PathBuf,
    resolver: Arc<dyn RefResolver>,
}

impl ManifestBuilder {
    /// Builder resolving prompt templates from the filesystem
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            resolver: Arc::new(FsRefResolver),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn RefResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build the manifest for one stage.
    ///
    /// A prompt template that cannot be resolved is returned as an error.
    pub fn build(
        &self,
        step: &StepDefinition,
        context: ManifestContext,
        learnings: &[Learning],
        flavor_resources: Option<&StepResources>,
    ) -> Result<Manifest, RefResolutionError> {
        let resources = aggregate_resources(step.resources.as_ref(), flavor_resources);

        let mut prompt = self.base_prompt(step)?;
        if let Some(resources) = resources.as_ref().filter(|r| !r.is_empty()) {
            prompt.push_str("\n\n");
            prompt.push_str(RESOURCES_HEADING);
            prompt.push_str("\n\n");
            prompt.push_str(&format_resources(resources));
        }
        let learnings_section = format_learnings(learnings);
        if !learnings_section.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(LEARNINGS_HEADING);
            prompt.push_str("\n\n");
            prompt.push_str(&learnings_section);
        }

        let (entry_gate, exit_gate) = attach_gates(step);

        Ok(Manifest {
            stage_type: step.step_type.clone(),
            stage_flavor: step.flavor.clone(),
            prompt,
            context,
            entry_gate,
            exit_gate,
            artifacts: step.artifacts.clone(),
            learnings: learnings.to_vec(),
            resources,
        })
    }

    fn base_prompt(&self, step: &StepDefinition) -> Result<String, RefResolutionError> {
        match &step.prompt_template {
            Some(reference) => Ok(self
                .resolver
                .resolve(reference, &self.templates_dir)?
                .trim_end()
                .to_string()),
            None => Ok(default_prompt(step)),
        }
    }
}

fn default_prompt(step: &StepDefinition) -> String {
    let mut prompt = format!("# Step: {}\n\nExecute the {} step.", step.step_type, step.step_type);
    if !step.description.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&step.description);
    }
    prompt
}

/// Copy a step's gate definitions
pub fn attach_gates(step: &StepDefinition) -> (Option<Gate>, Option<Gate>) {
    (step.entry_gate.clone(), step.exit_gate.clone())
}

/// Merge step and flavor resources; the step's entries win on a name clash
pub fn aggregate_resources(
    step: Option<&StepResources>,
    flavor: Option<&StepResources>,
) -> Option<StepResources> {
    match (step, flavor) {
        (None, None) => None,
        (Some(step), None) => Some(step.clone()),
        (None, Some(flavor)) => Some(flavor.clone()),
        (Some(step), Some(flavor)) => {
            let mut merged = step.clone();
            merged.merge_missing(flavor);
            Some(merged)
        }
    }
}

/// Render resource hints as Tools/Agents/Skills subsections
pub fn format_resources(resources: &StepResources) -> String {
    let mut sections = Vec::new();

    if !resources.tools.is_empty() {
        let mut out = String::from("### Tools\n");
        for tool in &resources.tools {
            let _ = write!(out, "\n- {}: {}", tool.name, tool.purpose);
            if let Some(command) = &tool.command {
                let _ = write!(out, " (`{}`)", command);
            }
        }
        sections.push(out);
    }

    let named = |heading: &str, entries: Vec<(&String, &Option<String>)>| {
        let mut out = format!("### {}\n", heading);
        for (name, when) in entries {
            let _ = write!(out, "\n- {}", name);
            if let Some(when) = when {
                let _ = write!(out, " — {}", when);
            }
        }
        out
    };
    if !resources.agents.is_empty() {
        sections.push(named(
            "Agents",
            resources.agents.iter().map(|a| (&a.name, &a.when)).collect(),
        ));
    }
    if !resources.skills.is_empty() {
        sections.push(named(
            "Skills",
            resources.skills.iter().map(|s| (&s.name, &s.when)).collect(),
        ));
    }

    sections.join("\n\n")
}

/// Render learnings, one block each. No learnings renders as empty.
pub fn format_learnings(learnings: &[Learning]) -> String {
    learnings
        .iter()
        .map(|learning| {
            let mut block = format!(
                "### [{}] {} (confidence: {}%)\n\n{}",
                learning.tier.to_string().to_uppercase(),
                learning.category,
                learning.confidence_percent(),
                learning.content
            );
            if !learning.evidence.is_empty() {
                block.push_str("\n\nEvidence:");
                for evidence in &learning.evidence {
                    let _ = write!(
                        block,
                        "\n- {} (pipeline {}, stage {})",
                        evidence.observation, evidence.pipeline_id, evidence.stage_type
                    );
                }
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
