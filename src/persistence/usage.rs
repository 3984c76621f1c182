//! JSON token usage ledger

use crate::agent::TokenUsage;
use crate::persistence::{write_json_atomic, TokenTracker};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Keeps a single JSON map of usage key to summed usage.
///
/// Writes are serialized through a lock so concurrent records from one
/// process do not lose updates.
pub struct JsonUsageLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonUsageLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Read the whole ledger; a missing file is an empty ledger
    pub async fn load(&self) -> Result<BTreeMap<String, TokenUsage>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse usage ledger {}", self.path.display()))
    }

    pub async fn usage(&self, key: &str) -> Result<Option<TokenUsage>> {
        Ok(self.load().await?.get(key).copied())
    }
}

#[async_trait::async_trait]
impl TokenTracker for JsonUsageLedger {
    async fn record_usage(&self, key: &str, usage: &TokenUsage) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut ledger = self.load().await?;
        let entry = ledger.entry(key.to_string()).or_default();
        *entry = entry.add(usage);
        write_json_atomic(&self.path, &ledger).await
    }
}
