//! Gate evaluator

use crate::core::{Gate, GateCondition};
use crate::execution::condition::{evaluate_condition, RuntimeState};
use serde::Serialize;

/// Outcome of evaluating a gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub passed: bool,

    /// Conditions that did not hold, in gate order
    pub failed_conditions: Vec<GateCondition>,

    /// Set when an advisory gate had failing conditions
    pub advisory: bool,
}

impl GateResult {
    fn open() -> Self {
        Self {
            passed: true,
            failed_conditions: Vec::new(),
            advisory: false,
        }
    }
}

/// Evaluate a gate. An absent gate passes; an advisory gate always passes
/// but still reports what failed.
pub async fn evaluate_gate(gate: Option<&Gate>, state: &RuntimeState<'_>) -> GateResult {
    let Some(gate) = gate else {
        return GateResult::open();
    };

    let mut failed_conditions = Vec::new();
    for condition in &gate.conditions {
        if !evaluate_condition(condition, state).await {
            failed_conditions.push(condition.clone());
        }
    }

    let all_passed = failed_conditions.is_empty();
    GateResult {
        passed: all_passed || !gate.required,
        advisory: !gate.required && !all_passed,
        failed_conditions,
    }
}
