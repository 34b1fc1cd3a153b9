//! Batch orchestration
//!
//! Optimistic merge, one combined validation, and sequential fault
//! isolation when the combined validation fails:
//! 1. State - change set and integration bookkeeping (pure, testable)
//! 2. Orchestrate - the phases, driving the collaborators (effectful)
//! 3. Outcome - the report handed back to the caller

mod orchestrate;
mod outcome;
mod state;

pub use orchestrate::{Orchestrator, check_preconditions};
pub use outcome::{RunOutcome, RunReport};
pub use state::{ChangeRecord, ChangeSet, IntegrationState, OrchestratorState};
