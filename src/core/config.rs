//! Project configuration and pipeline templates from YAML

use crate::agent::AdapterConfig;
use crate::core::{
    pipeline::{Pipeline, PipelineMetadata},
    step::StageRef,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project directory created next to the work being delivered
pub const DEFAULT_ROOT: &str = ".stagecraft";

/// Name of the config file inside the project directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Project-level configuration, loaded from `<root>/config.yaml`.
///
/// Every location is relative to the project root unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub steps_dir: PathBuf,
    pub flavors_dir: PathBuf,
    pub pipelines_dir: PathBuf,
    pub history_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub knowledge_file: PathBuf,
    pub usage_file: PathBuf,

    /// Channel whose learnings are injected into every stage
    pub default_subscription: String,

    /// Working directory for `command-passes` conditions and the adapter
    pub working_dir: Option<PathBuf>,

    /// Timeout for `command-passes` conditions (in seconds)
    pub gate_command_timeout_secs: u64,

    pub adapter: AdapterConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            steps_dir: PathBuf::from("steps"),
            flavors_dir: PathBuf::from("flavors"),
            pipelines_dir: PathBuf::from("pipelines"),
            history_dir: PathBuf::from("history"),
            templates_dir: PathBuf::from("templates"),
            knowledge_file: PathBuf::from("knowledge/learnings.json"),
            usage_file: PathBuf::from("usage.json"),
            default_subscription: "default".to_string(),
            working_dir: None,
            gate_command_timeout_secs: 300,
            adapter: AdapterConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load the configuration for a project root; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProjectConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.adapter.timeout_secs == 0 {
            anyhow::bail!("adapter.timeout_secs must be greater than zero");
        }
        if self.gate_command_timeout_secs == 0 {
            anyhow::bail!("gate_command_timeout_secs must be greater than zero");
        }
        if self.default_subscription.trim().is_empty() {
            anyhow::bail!("default_subscription must not be empty");
        }
        Ok(())
    }

    /// Resolve a configured location against the project root
    pub fn resolve(&self, root: &Path, location: &Path) -> PathBuf {
        if location.is_absolute() {
            location.to_path_buf()
        } else {
            root.join(location)
        }
    }

    /// Directory commands and the adapter run in
    pub fn working_dir(&self, root: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) => self.resolve(root, dir),
            None => root
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// A pipeline blueprint as authored in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTemplate {
    /// Pipeline name
    pub name: String,

    /// Pipeline type (e.g. "vertical", "bug-fix")
    #[serde(rename = "type")]
    pub pipeline_type: String,

    /// Ordered stages
    pub stages: Vec<StageRef>,

    #[serde(default)]
    pub metadata: PipelineMetadata,
}

impl PipelineTemplate {
    /// Load a pipeline template from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline template from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let template: PipelineTemplate = serde_yaml::from_str(yaml)?;
        template.validate()?;
        Ok(template)
    }

    /// Validate the template
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }
        if self.stages.is_empty() {
            anyhow::bail!("Pipeline '{}' has no stages", self.name);
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.step_type.trim().is_empty() {
                anyhow::bail!("Stage {} of pipeline '{}' has an empty type", index, self.name);
            }
        }
        Ok(())
    }

    /// Create a fresh draft pipeline from this template
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.name.clone(),
            self.pipeline_type.clone(),
            self.stages.clone(),
            self.metadata.clone(),
        )
    }
}
