//! File-reference resolution for prompt templates

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A reference that could not be located or read
#[derive(Debug, Error)]
#[error("Cannot resolve reference '{reference}' from '{}': {reason}", .base_dir.display())]
pub struct RefResolutionError {
    pub reference: String,
    pub base_dir: PathBuf,
    pub reason: String,
}

/// Resolves a reference to file content
pub trait RefResolver: Send + Sync {
    fn resolve(&self, reference: &str, base_dir: &Path) -> Result<String, RefResolutionError>;
}

/// Resolver reading from the local filesystem.
///
/// Relative references are joined to the base directory and may climb out of
/// it with `../` segments; absolute references are used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRefResolver;

impl FsRefResolver {
    /// Join and lexically normalize a reference against a base directory
    pub fn locate(reference: &str, base_dir: &Path) -> PathBuf {
        let joined = if Path::new(reference).is_absolute() {
            PathBuf::from(reference)
        } else {
            base_dir.join(reference)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        normalized.push("..");
                    }
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }
}

impl RefResolver for FsRefResolver {
    fn resolve(&self, reference: &str, base_dir: &Path) -> Result<String, RefResolutionError> {
        let error = |reason: String| RefResolutionError {
            reference: reference.to_string(),
            base_dir: base_dir.to_path_buf(),
            reason,
        };

        if reference.trim().is_empty() {
            return Err(error("empty reference".to_string()));
        }

        let path = Self::locate(reference, base_dir);
        debug!("Resolving reference '{}' to {}", reference, path.display());

        if !path.is_file() {
            return Err(error(format!("{} does not exist", path.display())));
        }
        std::fs::read_to_string(&path).map_err(|e| error(e.to_string()))
    }
}
