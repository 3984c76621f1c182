//! Learning models shared with the knowledge store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope a learning applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningTier {
    Step,
    Flavor,
    Stage,
    Category,
    Agent,
}

impl fmt::Display for LearningTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LearningTier::Step => "step",
            LearningTier::Flavor => "flavor",
            LearningTier::Stage => "stage",
            LearningTier::Category => "category",
            LearningTier::Agent => "agent",
        };
        f.write_str(s)
    }
}

/// An observation backing a learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub pipeline_id: String,
    pub stage_type: String,
    pub observation: String,
    pub recorded_at: DateTime<Utc>,
}

/// Knowledge extracted from earlier executions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub id: String,
    pub tier: LearningTier,
    pub category: String,
    pub content: String,

    /// Confidence in the range 0.0 to 1.0
    pub confidence: f64,

    #[serde(default)]
    pub evidence: Vec<Evidence>,

    /// Step type this learning is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,

    /// Subscription channels this learning is published on
    #[serde(default)]
    pub channels: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl Learning {
    /// Confidence as a whole percentage
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Input for capturing a new learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInput {
    pub tier: LearningTier,
    pub category: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}
