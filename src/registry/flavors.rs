//! Flavor registry keyed by `(stage_category, name)`

use crate::core::Flavor;
use crate::registry::{read_json_dir, RegistryError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FlavorRegistry {
    flavors: BTreeMap<(String, String), Flavor>,
}

impl FlavorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flavor
    pub fn register(&mut self, flavor: Flavor) -> Result<(), RegistryError> {
        let key = (flavor.stage_category.clone(), flavor.name.clone());
        if self.flavors.contains_key(&key) {
            return Err(RegistryError::Duplicate(format!("{}/{}", key.0, key.1)));
        }
        self.flavors.insert(key, flavor);
        Ok(())
    }

    /// Load every `*.json` file in a directory as one flavor
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for flavor in read_json_dir::<Flavor>(dir.as_ref())? {
            registry.register(flavor)?;
        }
        debug!("Loaded {} flavors", registry.flavors.len());
        Ok(registry)
    }

    pub fn get(&self, stage_category: &str, name: &str) -> Result<&Flavor, RegistryError> {
        self.flavors
            .get(&(stage_category.to_string(), name.to_string()))
            .ok_or_else(|| RegistryError::FlavorNotFound {
                stage_category: stage_category.to_string(),
                name: name.to_string(),
            })
    }

    /// List flavors, optionally restricted to one stage category
    pub fn list(&self, stage_category: Option<&str>) -> Vec<&Flavor> {
        self.flavors
            .values()
            .filter(|f| stage_category.map_or(true, |c| f.stage_category == c))
            .collect()
    }
}
