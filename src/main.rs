use anyhow::{bail, Context, Result};
use chrono::Utc;
use stagecraft::{
    agent::CommandAdapter,
    cli::{
        commands::{ApproveCommand, CreateCommand, ListCommand, RunCommand, StatusCommand, ValidateCommand},
        output::*,
        Cli, Command,
    },
    core::config::{PipelineTemplate, ProjectConfig},
    execution::{
        Collaborators, ExecutionEvent, ManifestBuilder, PipelineRunner, PolicyOverride, ShellCommandRunner,
    },
    knowledge::JsonKnowledgeStore,
    persistence::{JsonHistoryStore, JsonPipelineStore, JsonUsageLedger, PipelineStore},
    registry::{FlavorRegistry, StepRegistry},
    validation::validate_flavor,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let root = cli.root.as_path();
    let config = ProjectConfig::load(root)
        .with_context(|| format!("Failed to load project config from {}", root.display()))?;

    match &cli.command {
        Command::Create(cmd) => create_pipeline(cmd, root, &config).await?,
        Command::Run(cmd) => run_pipeline(cmd, root, &config).await?,
        Command::Approve(cmd) => approve_stage(cmd, root, &config).await?,
        Command::Validate(cmd) => validate_flavors(cmd, root, &config)?,
        Command::List(cmd) => list_pipelines(cmd, root, &config).await?,
        Command::Status(cmd) => show_status(cmd, root, &config).await?,
    }

    Ok(())
}

fn pipeline_store(root: &Path, config: &ProjectConfig) -> JsonPipelineStore {
    JsonPipelineStore::new(config.resolve(root, &config.pipelines_dir))
}

async fn create_pipeline(cmd: &CreateCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let template = PipelineTemplate::from_file(&cmd.file)
        .with_context(|| format!("Failed to load pipeline template {}", cmd.file.display()))?;
    let pipeline = template.to_pipeline();

    pipeline_store(root, config).write(&pipeline).await?;

    println!(
        "{} Created pipeline {} ({} stages)",
        CHECK,
        style(&pipeline.name).bold(),
        pipeline.stages.len()
    );
    println!("  ID: {}", style(&pipeline.id).cyan());
    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let steps = StepRegistry::load_dir(config.resolve(root, &config.steps_dir))
        .context("Failed to load step definitions")?;
    let store = Arc::new(pipeline_store(root, config));
    let mut pipeline = store
        .read(&cmd.pipeline)
        .await
        .context("Failed to load pipeline")?;

    println!("{} Loaded pipeline: {}", INFO, style(&pipeline.name).bold());

    let working_dir = config.working_dir(root);
    let adapter = CommandAdapter::new(config.adapter.clone()).with_working_dir(&working_dir);
    println!("{} Adapter: {}", INFO, style(adapter.command()).cyan());

    let collaborators = Collaborators {
        steps: Arc::new(steps),
        adapter: Arc::new(adapter),
        store,
        knowledge: Arc::new(JsonKnowledgeStore::new(config.resolve(root, &config.knowledge_file))),
        tokens: Arc::new(JsonUsageLedger::new(config.resolve(root, &config.usage_file))),
        history: Arc::new(JsonHistoryStore::new(config.resolve(root, &config.history_dir))),
    };

    // Set up event handler for console output
    let progress = create_progress_bar(pipeline.stages.len());
    progress.set_position(pipeline.stages.iter().filter(|s| s.state.is_terminal()).count() as u64);
    let bar = progress.clone();

    let mut runner = PipelineRunner::new(collaborators)
        .with_manifest_builder(ManifestBuilder::new(config.resolve(root, &config.templates_dir)))
        .with_command_runner(Arc::new(ShellCommandRunner::new(config.gate_command_timeout_secs)))
        .with_working_dir(&working_dir)
        .with_subscription(&config.default_subscription)
        .with_event_handler(move |event| {
            bar.println(format_execution_event(&event));
            match event {
                ExecutionEvent::StageStarted { stage_ref, .. } => bar.set_message(stage_ref.to_string()),
                ExecutionEvent::StageCompleted { .. }
                | ExecutionEvent::StageSkipped { .. }
                | ExecutionEvent::StageAborted { .. } => bar.inc(1),
                _ => {}
            }
        });
    if let Some(policy) = cmd.on_gate_failure {
        runner = runner.with_hook(Arc::new(PolicyOverride::new(policy.into())));
    }

    let outcome = runner.run(&mut pipeline).await;
    progress.finish_and_clear();
    let result = outcome?;

    if result.success {
        println!(
            "\n{} {} completed {} ({}/{} stages complete)",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green(),
            result.stages_completed,
            result.stages_total
        );
    } else {
        println!(
            "\n{} {} {} at stage {}",
            CROSS,
            style(&pipeline.name).bold(),
            style("aborted").red(),
            result.aborted_at.unwrap_or(pipeline.current_stage_index)
        );
        error!("Pipeline {} abandoned", pipeline.id);
        std::process::exit(1);
    }

    Ok(())
}

async fn approve_stage(cmd: &ApproveCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let store = pipeline_store(root, config);
    let mut pipeline = store.read(&cmd.pipeline).await?;
    if pipeline.state.is_terminal() {
        bail!("Pipeline {} is already {}", pipeline.id, pipeline.state);
    }

    let index = cmd.stage.unwrap_or(pipeline.current_stage_index);
    let stage = pipeline
        .stage_mut(index)
        .with_context(|| format!("Pipeline {} has no stage {}", cmd.pipeline, index))?;
    if stage.state.is_terminal() {
        bail!("Stage {} is already {}", index, stage.state);
    }
    stage.human_approved_at = Some(Utc::now());
    let stage_ref = stage.stage_ref.clone();

    pipeline.touch();
    store.write(&pipeline).await?;

    println!(
        "{} Approved stage {} ({}) of {}",
        CHECK,
        index,
        style(stage_ref).cyan(),
        style(&pipeline.name).bold()
    );
    Ok(())
}

fn validate_flavors(cmd: &ValidateCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let steps = StepRegistry::load_dir(config.resolve(root, &config.steps_dir))
        .context("Failed to load step definitions")?;
    let flavors = FlavorRegistry::load_dir(config.resolve(root, &config.flavors_dir))
        .context("Failed to load flavors")?;

    let selected = match &cmd.flavor {
        Some((category, name)) => vec![flavors.get(category, name)?],
        None => flavors.list(None),
    };
    if selected.is_empty() {
        println!("{} No flavors found", INFO);
        return Ok(());
    }

    let mut reports = Vec::new();
    for flavor in selected {
        let validation = validate_flavor(flavor, Some(&steps), &cmd.input_artifacts);
        reports.push((format!("{}/{}", flavor.stage_category, flavor.name), validation));
    }

    if cmd.json {
        let data: Vec<_> = reports
            .iter()
            .map(|(label, validation)| serde_json::json!({ "flavor": label, "valid": validation.valid, "errors": validation.errors }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for (label, validation) in &reports {
            println!("{}", format_validation(label, validation));
        }
    }

    if reports.iter().any(|(_, validation)| !validation.valid) {
        std::process::exit(1);
    }
    Ok(())
}

async fn list_pipelines(cmd: &ListCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let pipelines = pipeline_store(root, config).list().await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&pipelines)?);
        return Ok(());
    }

    if pipelines.is_empty() {
        println!("{} No pipelines found", INFO);
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for pipeline in &pipelines {
        println!("  {}", format_pipeline_summary(pipeline));
    }
    Ok(())
}

async fn show_status(cmd: &StatusCommand, root: &Path, config: &ProjectConfig) -> Result<()> {
    let pipeline = pipeline_store(root, config).read(&cmd.pipeline).await?;
    let history = JsonHistoryStore::new(config.resolve(root, &config.history_dir))
        .load_for_pipeline(&pipeline.id)
        .await
        .context("Failed to load captured results")?;

    if cmd.json {
        let data = serde_json::json!({ "pipeline": pipeline, "history": history });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipeline Details", INFO);
    println!("  ID: {}", style(&pipeline.id).cyan());
    println!("  Name: {}", style(&pipeline.name).bold());
    println!("  Type: {}", pipeline.pipeline_type);
    println!("  State: {}", format_pipeline_status(pipeline.state));
    if !pipeline.metadata.issue_refs.is_empty() {
        println!("  Issues: {}", pipeline.metadata.issue_refs.join(", "));
    }
    println!("  Updated: {}", style(pipeline.updated_at.to_rfc3339()).dim());
    println!("\n  {}", style("Stages:").bold());
    for (index, stage) in pipeline.stages.iter().enumerate() {
        let current = index == pipeline.current_stage_index && !pipeline.state.is_terminal();
        println!("  {}", format_stage_line(index, stage, current));
    }

    if !history.is_empty() {
        println!("\n  {}", style("Captured results:").bold());
        for result in &history {
            println!("  {}", format_captured_result(result));
        }
    }
    Ok(())
}
