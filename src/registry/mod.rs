//! Step and flavor registries
//!
//! Definitions are immutable once registered: registering the same key twice
//! is an error rather than a replacement.

pub mod flavors;

use crate::core::StepDefinition;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use flavors::FlavorRegistry;

/// Error types for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Step '{}' is not registered", display_key(.step_type, .flavor.as_deref()))]
    StepNotFound {
        step_type: String,
        flavor: Option<String>,
    },

    #[error("Flavor '{stage_category}/{name}' is not registered")]
    FlavorNotFound { stage_category: String, name: String },

    #[error("'{0}' is already registered")]
    Duplicate(String),

    #[error("Failed to read definition {}: {message}", .path.display())]
    InvalidDefinition { path: PathBuf, message: String },
}

fn display_key(step_type: &str, flavor: Option<&str>) -> String {
    match flavor {
        Some(flavor) => format!("{}:{}", step_type, flavor),
        None => step_type.to_string(),
    }
}

/// Optional restriction for [`StepResolver::list`]
#[derive(Debug, Clone, Default)]
pub struct StepFilter {
    pub step_type: Option<String>,
    pub flavor: Option<String>,
}

impl StepFilter {
    fn matches(&self, step: &StepDefinition) -> bool {
        self.step_type
            .as_ref()
            .map_or(true, |t| *t == step.step_type)
            && self
                .flavor
                .as_ref()
                .map_or(true, |f| step.flavor.as_ref() == Some(f))
    }
}

/// Resolves a step reference to its full definition
pub trait StepResolver: Send + Sync {
    fn get(&self, step_type: &str, flavor: Option<&str>) -> Result<StepDefinition, RegistryError>;

    fn list(&self, filter: Option<&StepFilter>) -> Vec<StepDefinition>;
}

type StepKey = (String, Option<String>);

/// In-memory step registry keyed by `(type, flavor)`
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<StepKey, StepDefinition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step definition
    pub fn register(&mut self, step: StepDefinition) -> Result<(), RegistryError> {
        let key = (step.step_type.clone(), step.flavor.clone());
        if self.steps.contains_key(&key) {
            return Err(RegistryError::Duplicate(display_key(&key.0, key.1.as_deref())));
        }
        self.steps.insert(key, step);
        Ok(())
    }

    /// Load every `*.json` file in a directory as one step definition
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for step in read_json_dir::<StepDefinition>(dir.as_ref())? {
            registry.register(step)?;
        }
        debug!("Loaded {} step definitions", registry.len());
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl StepResolver for StepRegistry {
    fn get(&self, step_type: &str, flavor: Option<&str>) -> Result<StepDefinition, RegistryError> {
        self.steps
            .get(&(step_type.to_string(), flavor.map(str::to_string)))
            .cloned()
            .ok_or_else(|| RegistryError::StepNotFound {
                step_type: step_type.to_string(),
                flavor: flavor.map(str::to_string),
            })
    }

    fn list(&self, filter: Option<&StepFilter>) -> Vec<StepDefinition> {
        self.steps
            .values()
            .filter(|step| filter.map_or(true, |f| f.matches(step)))
            .cloned()
            .collect()
    }
}

/// Read and parse every `*.json` file of a directory, in file name order.
/// A missing directory is treated as empty.
pub(crate) fn read_json_dir<T: serde::de::DeserializeOwned>(
    dir: &Path,
) -> Result<Vec<T>, RegistryError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let invalid = |path: &Path, message: String| RegistryError::InvalidDefinition {
        path: path.to_path_buf(),
        message,
    };

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| invalid(dir, e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
            serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))
        })
        .collect()
}
