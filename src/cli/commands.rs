//! CLI command definitions

use crate::execution::GateDecision;
use clap::Args;
use std::path::PathBuf;

/// Create a draft pipeline
#[derive(Debug, Args, Clone)]
pub struct CreateCommand {
    /// Path to pipeline template YAML file
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Run or resume a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Pipeline id
    #[arg(short, long)]
    pub pipeline: String,

    /// Answer every required gate failure this way instead of aborting
    #[arg(long, value_enum)]
    pub on_gate_failure: Option<GateFailureArg>,
}

/// Record human approval on a stage
#[derive(Debug, Args, Clone)]
pub struct ApproveCommand {
    /// Pipeline id
    #[arg(short, long)]
    pub pipeline: String,

    /// Stage index (defaults to the current stage)
    #[arg(short, long)]
    pub stage: Option<usize>,
}

/// Validate flavor compositions
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Flavor to validate, as <category>/<name>
    #[arg(long, value_parser = parse_flavor_key, required_unless_present = "all", conflicts_with = "all")]
    pub flavor: Option<(String, String)>,

    /// Artifact available before the flavor's first step (repeatable)
    #[arg(long = "input-artifact")]
    pub input_artifacts: Vec<String>,

    /// Validate every registered flavor
    #[arg(long)]
    pub all: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List stored pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show one pipeline
#[derive(Debug, Args, Clone)]
pub struct StatusCommand {
    /// Pipeline id
    #[arg(short, long)]
    pub pipeline: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Gate failure policy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GateFailureArg {
    Skip,
    Abort,
}

impl From<GateFailureArg> for GateDecision {
    fn from(arg: GateFailureArg) -> Self {
        match arg {
            GateFailureArg::Skip => GateDecision::Skip,
            GateFailureArg::Abort => GateDecision::Abort,
        }
    }
}

/// Parse a `<category>/<name>` flavor key
pub fn parse_flavor_key(s: &str) -> Result<(String, String), String> {
    match s.split_once('/') {
        Some((category, name)) if !category.is_empty() && !name.is_empty() => {
            Ok((category.to_string(), name.to_string()))
        }
        _ => Err(format!("Invalid flavor '{}', expected <category>/<name>", s)),
    }
}
