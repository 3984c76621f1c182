//! CLI output formatting

use crate::{
    core::{Pipeline, PipelineStatus, StageExecutionState, StageStatus},
    execution::ExecutionEvent,
    persistence::CapturedResult,
    validation::FlavorValidation,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar over the stages of a run
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a pipeline state for display
pub fn format_pipeline_status(status: PipelineStatus) -> String {
    match status {
        PipelineStatus::Draft => style("DRAFT").dim().to_string(),
        PipelineStatus::Active => style("ACTIVE").yellow().to_string(),
        PipelineStatus::Complete => style("COMPLETE").green().to_string(),
        PipelineStatus::Abandoned => style("ABANDONED").red().to_string(),
    }
}

/// Format a stage state for display
pub fn format_stage_status(status: StageStatus) -> String {
    match status {
        StageStatus::Pending => style("PENDING").dim().to_string(),
        StageStatus::Active => style("ACTIVE").yellow().to_string(),
        StageStatus::Complete => style("COMPLETE").green().to_string(),
        StageStatus::Failed => style("FAILED").red().to_string(),
        StageStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// One-line pipeline summary for listings
pub fn format_pipeline_summary(pipeline: &Pipeline) -> String {
    let icon = match pipeline.state {
        PipelineStatus::Complete => CHECK,
        PipelineStatus::Abandoned => CROSS,
        PipelineStatus::Active => SPINNER,
        PipelineStatus::Draft => INFO,
    };

    format!(
        "{} {} - {} ({}) - {} ({}/{})",
        icon,
        style(short_id(&pipeline.id)).dim(),
        style(&pipeline.name).bold(),
        pipeline.pipeline_type,
        format_pipeline_status(pipeline.state),
        pipeline.stages_completed(),
        pipeline.stages.len()
    )
}

/// One line per stage for the status view
pub fn format_stage_line(index: usize, stage: &StageExecutionState, current: bool) -> String {
    let marker = if current { ">" } else { " " };
    let mut line = format!(
        "{} {:>2}. {} {}",
        marker,
        index,
        style(&stage.stage_ref).cyan(),
        format_stage_status(stage.state)
    );
    if let Some(approved) = stage.human_approved_at {
        line.push_str(&format!(" (approved {})", style(approved.to_rfc3339()).dim()));
    }
    if !stage.artifacts.is_empty() {
        let names: Vec<&str> = stage.artifacts.iter().map(|a| a.name.as_str()).collect();
        line.push_str(&format!(" [{}]", names.join(", ")));
    }
    line
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            pipeline_id,
            pipeline_name,
            stages_total,
        } => format!(
            "{} Starting pipeline {} ({}, {} stages)",
            ROCKET,
            style(pipeline_name).bold(),
            style(short_id(pipeline_id)).dim(),
            stages_total
        ),
        ExecutionEvent::StageStarted {
            stage_index,
            stage_ref,
        } => format!("{} [{}] {}", SPINNER, stage_index, style(stage_ref).cyan()),
        ExecutionEvent::GateFailed {
            stage_index,
            gate_type,
            failed_conditions,
            advisory,
        } => {
            let conditions: Vec<String> = failed_conditions.iter().map(ToString::to_string).collect();
            let label = if *advisory { "advisory gate" } else { "gate" };
            format!(
                "{} [{}] {} {} not satisfied: {}",
                WARN,
                stage_index,
                gate_type,
                label,
                style(conditions.join(", ")).yellow()
            )
        }
        ExecutionEvent::StageCompleted {
            stage_index,
            artifacts,
        } => {
            if artifacts.is_empty() {
                format!("{} [{}] complete", CHECK, stage_index)
            } else {
                format!(
                    "{} [{}] complete → {}",
                    CHECK,
                    stage_index,
                    style(artifacts.join(", ")).green()
                )
            }
        }
        ExecutionEvent::StageSkipped { stage_index } => {
            format!("{} [{}] {}", SKIP, stage_index, style("skipped").dim())
        }
        ExecutionEvent::StageAborted { stage_index } => {
            format!("{} [{}] {}", CROSS, stage_index, style("aborted").red())
        }
        ExecutionEvent::LearningCaptured {
            stage_index,
            learning_id,
        } => format!(
            "{} [{}] learning captured ({})",
            INFO,
            stage_index,
            style(short_id(learning_id)).dim()
        ),
        ExecutionEvent::PipelineFinished { pipeline_id, state } => format!(
            "{} Pipeline ({}) {}",
            INFO,
            style(short_id(pipeline_id)).dim(),
            format_pipeline_status(*state)
        ),
    }
}

/// One line per captured adapter result
pub fn format_captured_result(result: &CapturedResult) -> String {
    let input = &result.input;
    let icon = if input.success { CHECK } else { WARN };
    let mut line = format!(
        "{} {:>2}. {} {}",
        icon,
        input.stage_index,
        style(&input.step_type).cyan(),
        style(short_id(&result.id)).dim()
    );
    if let Some(usage) = &input.token_usage {
        line.push_str(&format!(" ({} tokens)", usage.total()));
    }
    line
}

/// Render a validation report for one flavor
pub fn format_validation(label: &str, validation: &FlavorValidation) -> String {
    if validation.valid {
        return format!("{} {} is valid", CHECK, style(label).bold());
    }
    let mut out = format!(
        "{} {} has {} problem(s):",
        CROSS,
        style(label).bold(),
        validation.errors.len()
    );
    for error in &validation.errors {
        out.push_str(&format!("\n  - {}", style(error).red()));
    }
    out
}
