//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::config::DEFAULT_ROOT;
use clap::{Parser, Subcommand};
use commands::{
    ApproveCommand, CreateCommand, ListCommand, RunCommand, StatusCommand, ValidateCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Gated, resumable stage pipelines
#[derive(Debug, Parser, Clone)]
#[command(name = "stagecraft")]
#[command(version)]
#[command(about = "Run gated, resumable multi-stage pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding config, steps, flavors and pipelines
    #[arg(long, global = true, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create a draft pipeline from a template
    Create(CreateCommand),

    /// Run or resume a pipeline
    Run(RunCommand),

    /// Record human approval on a stage
    Approve(ApproveCommand),

    /// Validate flavor compositions
    Validate(ValidateCommand),

    /// List stored pipelines
    List(ListCommand),

    /// Show one pipeline's stages
    Status(StatusCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
