//! Scenario-based tests for the pipeline runner


mod gate_failures;
mod learnings;
mod persistence;
mod success_chain;
