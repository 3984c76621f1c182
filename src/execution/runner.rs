//! Pipeline runner - walks a pipeline's stages through their gates

use crate::{
    agent::{AdapterError, StepAdapter},
    core::{
        ArtifactRecord, Gate, GateCondition, GateType, Learning, LearningInput, LearningTier,
        Pipeline, PipelineStatus, RunAccumulator, StageRef, StageStatus, StepDefinition,
    },
    execution::{
        condition::{CommandRunner, RuntimeState, ShellCommandRunner},
        gate::{evaluate_gate, GateResult},
        hooks::{GateDecision, GateOverrideContext, LearningCaptureContext, OverrideHook},
        manifest::{ManifestBuilder, ManifestContext},
    },
    knowledge::KnowledgeStore,
    persistence::{usage_key, CaptureInput, PipelineStore, ResultCapturer, TokenTracker},
    refs::RefResolutionError,
    registry::{RegistryError, StepResolver},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop a run outright. Gate failures are not errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    StepResolution(#[from] RegistryError),

    #[error(transparent)]
    Template(#[from] RefResolutionError),

    #[error("Adapter failed on stage {stage_index}: {source}")]
    Adapter {
        stage_index: usize,
        #[source]
        source: AdapterError,
    },

    #[error("Failed to persist pipeline {pipeline_id}: {error:#}")]
    Storage {
        pipeline_id: String,
        error: anyhow::Error,
    },

    #[error("{collaborator} failed: {error:#}")]
    Collaborator {
        collaborator: &'static str,
        error: anyhow::Error,
    },

    #[error("Pipeline {pipeline_id} is already {state}")]
    AlreadyFinished {
        pipeline_id: String,
        state: PipelineStatus,
    },
}

fn collaborator(name: &'static str) -> impl FnOnce(anyhow::Error) -> RunnerError {
    move |error| RunnerError::Collaborator {
        collaborator: name,
        error,
    }
}

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        pipeline_id: String,
        pipeline_name: String,
        stages_total: usize,
    },
    StageStarted {
        stage_index: usize,
        stage_ref: StageRef,
    },
    GateFailed {
        stage_index: usize,
        gate_type: GateType,
        failed_conditions: Vec<GateCondition>,
        advisory: bool,
    },
    StageCompleted {
        stage_index: usize,
        artifacts: Vec<String>,
    },
    StageSkipped {
        stage_index: usize,
    },
    StageAborted {
        stage_index: usize,
    },
    LearningCaptured {
        stage_index: usize,
        learning_id: String,
    },
    PipelineFinished {
        pipeline_id: String,
        state: PipelineStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub pipeline_id: String,

    /// False iff the walk stopped on an abort
    pub success: bool,

    pub stages_completed: usize,
    pub stages_total: usize,

    /// Results captured by this run
    pub history_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<usize>,
}

/// Everything the runner delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub steps: Arc<dyn StepResolver>,
    pub adapter: Arc<dyn StepAdapter>,
    pub store: Arc<dyn PipelineStore>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub tokens: Arc<dyn TokenTracker>,
    pub history: Arc<dyn ResultCapturer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Completed,
    Skipped,
    Aborted,
}

impl From<GateDecision> for StageOutcome {
    fn from(decision: GateDecision) -> Self {
        match decision {
            GateDecision::Skip => StageOutcome::Skipped,
            GateDecision::Abort => StageOutcome::Aborted,
        }
    }
}

/// Sequential pipeline runner
pub struct PipelineRunner {
    collaborators: Collaborators,
    manifests: ManifestBuilder,
    commands: Arc<dyn CommandRunner>,
    hook: Option<Arc<dyn OverrideHook>>,
    working_dir: PathBuf,
    subscription: String,
    event_handlers: Vec<EventHandler>,
}

impl PipelineRunner {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            manifests: ManifestBuilder::new("templates"),
            commands: Arc::new(ShellCommandRunner::default()),
            hook: None,
            working_dir: PathBuf::from("."),
            subscription: "default".to_string(),
            event_handlers: Vec::new(),
        }
    }

    pub fn with_manifest_builder(mut self, manifests: ManifestBuilder) -> Self {
        self.manifests = manifests;
        self
    }

    pub fn with_command_runner(mut self, commands: Arc<dyn CommandRunner>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn OverrideHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Directory gate commands run in and relative artifact paths resolve against
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Knowledge channel whose learnings are injected into every manifest
    pub fn with_subscription(mut self, channel: impl Into<String>) -> Self {
        self.subscription = channel.into();
        self
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Load a stored pipeline and run it
    pub async fn run_stored(&self, pipeline_id: &str) -> Result<RunResult, RunnerError> {
        let mut pipeline = self
            .collaborators
            .store
            .read(pipeline_id)
            .await
            .map_err(|error| RunnerError::Storage {
                pipeline_id: pipeline_id.to_string(),
                error,
            })?;
        self.run(&mut pipeline).await
    }

    /// Run a pipeline from its first unsettled stage.
    ///
    /// The pipeline is persisted after every stage transition, so a run that
    /// stops with an error can be resumed by calling `run` again.
    pub async fn run(&self, pipeline: &mut Pipeline) -> Result<RunResult, RunnerError> {
        if pipeline.state.is_terminal() {
            return Err(RunnerError::AlreadyFinished {
                pipeline_id: pipeline.id.clone(),
                state: pipeline.state,
            });
        }

        if pipeline.state == PipelineStatus::Draft {
            pipeline.state = PipelineStatus::Active;
            pipeline.touch();
            self.persist(pipeline).await?;
        }

        info!(
            "Starting pipeline {} ({}) with {} stages",
            pipeline.name,
            pipeline.id,
            pipeline.stages.len()
        );
        self.emit(ExecutionEvent::PipelineStarted {
            pipeline_id: pipeline.id.clone(),
            pipeline_name: pipeline.name.clone(),
            stages_total: pipeline.stages.len(),
        });

        let mut acc = RunAccumulator::from_pipeline(pipeline);
        let mut history_ids = Vec::new();

        for index in 0..pipeline.stages.len() {
            let state = pipeline.stages[index].state;
            if state.is_terminal() {
                debug!("Stage {} already {}, not revisiting", index, state);
                continue;
            }

            pipeline.advance_to(index);
            let outcome = self
                .run_stage(pipeline, index, &mut acc, &mut history_ids)
                .await?;

            if outcome == StageOutcome::Aborted {
                warn!("Pipeline {} abandoned at stage {}", pipeline.id, index);
                self.emit(ExecutionEvent::PipelineFinished {
                    pipeline_id: pipeline.id.clone(),
                    state: pipeline.state,
                });
                return Ok(Self::result(pipeline, history_ids, Some(index)));
            }
        }

        pipeline.state = PipelineStatus::Complete;
        pipeline.advance_to(pipeline.stages.len());
        pipeline.touch();
        self.persist(pipeline).await?;

        info!(
            "Pipeline {} complete: {}/{} stages completed",
            pipeline.id,
            pipeline.stages_completed(),
            pipeline.stages.len()
        );
        self.emit(ExecutionEvent::PipelineFinished {
            pipeline_id: pipeline.id.clone(),
            state: pipeline.state,
        });

        Ok(Self::result(pipeline, history_ids, None))
    }

    fn result(pipeline: &Pipeline, history_ids: Vec<String>, aborted_at: Option<usize>) -> RunResult {
        RunResult {
            pipeline_id: pipeline.id.clone(),
            success: aborted_at.is_none(),
            stages_completed: pipeline.stages_completed(),
            stages_total: pipeline.stages.len(),
            history_ids,
            aborted_at,
        }
    }

    async fn run_stage(
        &self,
        pipeline: &mut Pipeline,
        index: usize,
        acc: &mut RunAccumulator,
        history_ids: &mut Vec<String>,
    ) -> Result<StageOutcome, RunnerError> {
        let stage_ref = pipeline.stages[index].stage_ref.clone();
        let step = self
            .collaborators
            .steps
            .get(&stage_ref.step_type, stage_ref.flavor.as_deref())?;

        let learnings = self.load_learnings(&step.step_type).await?;
        let context = ManifestContext {
            pipeline_id: pipeline.id.clone(),
            stage_index: index,
            metadata: pipeline.metadata.clone(),
        };
        let manifest = self.manifests.build(&step, context, &learnings, None)?;

        pipeline.stages[index].start();
        pipeline.touch();
        self.persist(pipeline).await?;
        info!("Stage {} ({}) started", index, stage_ref);
        self.emit(ExecutionEvent::StageStarted {
            stage_index: index,
            stage_ref,
        });

        let approved_at = pipeline.stages[index].human_approved_at;

        let entry = self
            .check_gate(step.entry_gate.as_ref(), acc, &[], approved_at)
            .await;
        if let Some(decision) = self.resolve_gate(pipeline, index, &step, GateType::Entry, entry).await {
            return self.settle(pipeline, index, &step, decision.into(), acc).await;
        }

        debug!("Invoking adapter for stage {} ({})", index, step.step_type);
        let result = self
            .collaborators
            .adapter
            .execute(&manifest)
            .await
            .map_err(|source| RunnerError::Adapter {
                stage_index: index,
                source,
            })?;
        if !result.success {
            warn!(
                "Adapter reported failure for stage {} ({}); gates decide the outcome",
                index, step.step_type
            );
        }

        let captured = self
            .collaborators
            .history
            .capture(CaptureInput {
                pipeline_id: pipeline.id.clone(),
                stage_index: index,
                step_type: step.step_type.clone(),
                success: result.success,
                artifacts: result.artifacts.iter().map(|a| a.name.clone()).collect(),
                token_usage: result.token_usage,
                completed_at: result.completed_at,
            })
            .await
            .map_err(collaborator("result capturer"))?;
        debug!("Captured result {} for stage {}", captured.id, index);
        history_ids.push(captured.id.clone());

        let stage = &mut pipeline.stages[index];
        stage.history_id = Some(captured.id);
        stage.artifacts = result.artifacts.clone();

        if let Some(usage) = &result.token_usage {
            self.collaborators
                .tokens
                .record_usage(&usage_key(&pipeline.id, index), usage)
                .await
                .map_err(collaborator("token tracker"))?;
        }

        let exit = self
            .check_gate(step.exit_gate.as_ref(), acc, &result.artifacts, approved_at)
            .await;
        if let Some(decision) = self.resolve_gate(pipeline, index, &step, GateType::Exit, exit).await {
            return self.settle(pipeline, index, &step, decision.into(), acc).await;
        }

        self.settle(pipeline, index, &step, StageOutcome::Completed, acc)
            .await
    }

    /// Stage learnings first, then the subscription channel, deduplicated by id
    async fn load_learnings(&self, step_type: &str) -> Result<Vec<Learning>, RunnerError> {
        let knowledge = &self.collaborators.knowledge;
        let mut learnings = knowledge
            .load_for_stage(step_type)
            .await
            .map_err(collaborator("knowledge store"))?;
        let subscribed = knowledge
            .load_for_subscriptions(&self.subscription)
            .await
            .map_err(collaborator("knowledge store"))?;

        let mut seen: HashSet<String> = learnings.iter().map(|l| l.id.clone()).collect();
        learnings.extend(subscribed.into_iter().filter(|l| seen.insert(l.id.clone())));
        Ok(learnings)
    }

    async fn check_gate(
        &self,
        gate: Option<&Gate>,
        acc: &RunAccumulator,
        produced: &[ArtifactRecord],
        human_approved_at: Option<DateTime<Utc>>,
    ) -> GateResult {
        let state = RuntimeState {
            artifacts: acc.artifacts_with(produced),
            completed_steps: acc.completed_steps(),
            human_approved_at,
            working_dir: self.working_dir.clone(),
            commands: self.commands.as_ref(),
        };
        evaluate_gate(gate, &state).await
    }

    /// Decide what a gate result means for the stage. `None` lets the stage go on.
    async fn resolve_gate(
        &self,
        pipeline: &Pipeline,
        index: usize,
        step: &StepDefinition,
        gate_type: GateType,
        result: GateResult,
    ) -> Option<GateDecision> {
        let failed = result
            .failed_conditions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        if result.passed {
            if result.advisory {
                warn!(
                    "Advisory {} gate of stage {} ({}) not satisfied: {}",
                    gate_type, index, step.step_type, failed
                );
                self.emit(ExecutionEvent::GateFailed {
                    stage_index: index,
                    gate_type,
                    failed_conditions: result.failed_conditions,
                    advisory: true,
                });
            }
            return None;
        }

        warn!(
            "{} gate of stage {} ({}) failed: {}",
            gate_type, index, step.step_type, failed
        );
        self.emit(ExecutionEvent::GateFailed {
            stage_index: index,
            gate_type,
            failed_conditions: result.failed_conditions.clone(),
            advisory: false,
        });

        let decision = match &self.hook {
            Some(hook) => {
                let context = GateOverrideContext {
                    pipeline_id: pipeline.id.clone(),
                    stage_index: index,
                    step_type: step.step_type.clone(),
                    gate_type,
                    failed_conditions: result.failed_conditions,
                };
                hook.gate_override(&context).await
            }
            None => None,
        };
        let decision = decision.unwrap_or(GateDecision::Abort);
        info!("Stage {} {} gate override: {}", index, gate_type, decision);
        Some(decision)
    }

    /// Put the stage in its terminal state, checkpoint, then capture a learning
    async fn settle(
        &self,
        pipeline: &mut Pipeline,
        index: usize,
        step: &StepDefinition,
        outcome: StageOutcome,
        acc: &mut RunAccumulator,
    ) -> Result<StageOutcome, RunnerError> {
        let stage = &mut pipeline.stages[index];
        let event = match outcome {
            StageOutcome::Completed => {
                stage.complete();
                acc.record_completed(&step.step_type, &stage.artifacts);
                info!("Stage {} ({}) complete", index, step.step_type);
                ExecutionEvent::StageCompleted {
                    stage_index: index,
                    artifacts: stage.artifacts.iter().map(|a| a.name.clone()).collect(),
                }
            }
            StageOutcome::Skipped => {
                stage.skip();
                info!("Stage {} ({}) skipped", index, step.step_type);
                ExecutionEvent::StageSkipped { stage_index: index }
            }
            StageOutcome::Aborted => {
                stage.fail();
                warn!("Stage {} ({}) failed, aborting", index, step.step_type);
                ExecutionEvent::StageAborted { stage_index: index }
            }
        };
        let status = stage.state;
        if outcome == StageOutcome::Aborted {
            pipeline.state = PipelineStatus::Abandoned;
        }

        // Settled state is on disk before any learning capture
        pipeline.touch();
        self.persist(pipeline).await?;
        self.emit(event);

        self.capture_learning(pipeline, index, &step.step_type, status)
            .await?;
        Ok(outcome)
    }

    async fn capture_learning(
        &self,
        pipeline: &Pipeline,
        index: usize,
        step_type: &str,
        outcome: StageStatus,
    ) -> Result<(), RunnerError> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };

        let context = LearningCaptureContext {
            pipeline_id: pipeline.id.clone(),
            stage_index: index,
            step_type: step_type.to_string(),
            outcome,
        };
        let Some(content) = hook.capture_learning(&context).await else {
            return Ok(());
        };

        let learning = self
            .collaborators
            .knowledge
            .capture(LearningInput {
                tier: LearningTier::Stage,
                category: step_type.to_string(),
                content,
                stage_type: Some(step_type.to_string()),
                confidence: None,
            })
            .await
            .map_err(collaborator("knowledge store"))?;

        info!("Captured learning {} from stage {}", learning.id, index);
        self.emit(ExecutionEvent::LearningCaptured {
            stage_index: index,
            learning_id: learning.id,
        });
        Ok(())
    }

    async fn persist(&self, pipeline: &Pipeline) -> Result<(), RunnerError> {
        self.collaborators
            .store
            .write(pipeline)
            .await
            .map_err(|error| RunnerError::Storage {
                pipeline_id: pipeline.id.clone(),
                error,
            })?;
        debug!(
            "Checkpoint: pipeline {} saved ({}, stage {})",
            pipeline.id, pipeline.state, pipeline.current_stage_index
        );
        Ok(())
    }
}
