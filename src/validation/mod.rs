//! Flavor DAG validation
//!
//! A flavor is checked in a single forward pass: walking its steps in order,
//! the set of available artifacts only grows, which is exactly how artifacts
//! become visible at run time. Every problem is collected; validation never
//! stops at the first error.

use crate::core::{Flavor, GateCondition, StepDefinition};
use crate::registry::StepResolver;
use serde::Serialize;
use std::collections::HashSet;

/// Result of validating one flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlavorValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl FlavorValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a flavor.
///
/// Override keys are always checked. Artifact dependencies are only checked
/// when a step resolver is given; `stage_inputs` are artifacts available
/// before the first step runs.
pub fn validate_flavor(
    flavor: &Flavor,
    steps: Option<&dyn StepResolver>,
    stage_inputs: &[String],
) -> FlavorValidation {
    let label = format!("{}/{}", flavor.stage_category, flavor.name);
    let mut errors: Vec<String> = flavor
        .unmatched_override_keys()
        .into_iter()
        .map(|key| {
            format!(
                "Override key \"{}\" does not match any step in flavor \"{}\"",
                key, label
            )
        })
        .collect();

    if let Some(steps) = steps {
        errors.extend(check_dependencies(flavor, &label, steps, stage_inputs));
    }

    FlavorValidation::from_errors(errors)
}

fn check_dependencies(
    flavor: &Flavor,
    label: &str,
    steps: &dyn StepResolver,
    stage_inputs: &[String],
) -> Vec<String> {
    let mut errors = Vec::new();

    let resolved: Vec<Option<StepDefinition>> = flavor
        .steps
        .iter()
        .map(|slot| match steps.get(&slot.step_type, slot.step_flavor.as_deref()) {
            Ok(step) => Some(step),
            Err(e) => {
                errors.push(format!(
                    "Step \"{}\" of flavor \"{}\" cannot be resolved: {}",
                    slot.step_name, label, e
                ));
                None
            }
        })
        .collect();

    // Producer of an artifact other than the consuming slot itself
    let producer_of = |artifact: &str, consumer: usize| {
        flavor
            .steps
            .iter()
            .zip(&resolved)
            .enumerate()
            .find(|(position, (_, step))| {
                *position != consumer
                    && step
                        .as_ref()
                        .is_some_and(|s| s.produced_artifacts().any(|name| name == artifact))
            })
            .map(|(_, (slot, _))| slot.step_name.as_str())
    };

    let mut available: HashSet<&str> = stage_inputs.iter().map(String::as_str).collect();
    let mut synthesis_satisfied = false;

    for (position, (slot, step)) in flavor.steps.iter().zip(&resolved).enumerate() {
        let Some(step) = step else {
            continue;
        };

        let required = step
            .entry_gate
            .iter()
            .flat_map(|gate| gate.conditions.iter())
            .filter_map(|condition| match condition {
                GateCondition::ArtifactExists { artifact_name, .. } => Some(artifact_name.as_str()),
                _ => None,
            });
        for artifact in required {
            if available.contains(artifact) {
                continue;
            }
            match producer_of(artifact, position) {
                Some(producer) => errors.push(format!(
                    "Step \"{}\" requires artifact \"{}\", which is produced by step \"{}\" that does not run before it; move \"{}\" earlier",
                    slot.step_name, artifact, producer, producer
                )),
                None => errors.push(format!(
                    "Step \"{}\" requires artifact \"{}\", which no step in flavor \"{}\" produces and is not a stage input",
                    slot.step_name, artifact, label
                )),
            }
        }

        for produced in step.produced_artifacts() {
            if produced == flavor.synthesis_artifact {
                synthesis_satisfied = true;
            }
            available.insert(produced);
        }
    }

    if !synthesis_satisfied {
        errors.push(format!(
            "Synthesis artifact \"{}\" is never produced by flavor \"{}\"",
            flavor.synthesis_artifact, label
        ));
    }

    errors
}
