//! The three-phase run
//!
//! 1. Optimistic - merge every change in order, no validation
//! 2. Combined - validate everything that merged in one go
//! 3. Isolation - only if 2 failed: start over from the original reference
//!    and validate after every merge, dropping each failing change's commit
//!
//! Phase 3 is a linear scan, not a bisection.

use crate::artifacts::{ArtifactStore, COMBINED_KEY};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::guard::ResourceGuard;
use crate::integrate::{Integration, IntegrationEngine};
use crate::progress::{Phase, ProgressCallback};
use crate::run::{OrchestratorState, RunOutcome, RunReport};
use crate::types::{Change, ChangeStatus, Stage};
use crate::validate::{InstallOutcome, ValidationRunner, Verdict};
use crate::vcs::Vcs;
use chrono::Utc;
use tracing::info;

/// Fail unless the working tree is clean
///
/// Checked once before anything is touched.
pub fn check_preconditions(vcs: &dyn Vcs) -> Result<()> {
    if vcs.is_clean()? {
        Ok(())
    } else {
        Err(Error::DirtyWorkingTree)
    }
}

/// Drives a batch through the merge and validation phases
pub struct Orchestrator<'a> {
    vcs: &'a dyn Vcs,
    engine: IntegrationEngine<'a>,
    runner: ValidationRunner<'a>,
    progress: &'a dyn ProgressCallback,
    cancel: &'a CancelToken,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator from its collaborators
    pub const fn new(
        vcs: &'a dyn Vcs,
        engine: IntegrationEngine<'a>,
        runner: ValidationRunner<'a>,
        progress: &'a dyn ProgressCallback,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            vcs,
            engine,
            runner,
            progress,
            cancel,
        }
    }

    /// Run the batch on the scratch branch owned by `guard`
    ///
    /// The caller owns cleanup: whatever this returns, the guard still holds
    /// the scratch branch and the artifacts.
    pub fn run(&self, changes: &[Change], guard: &ResourceGuard<'_>) -> Result<RunReport> {
        let started_at = Utc::now();
        let store = guard
            .artifacts()
            .ok_or_else(|| Error::Internal("artifact storage already disposed".to_string()))?;

        let mut state = OrchestratorState::new(changes, self.vcs.head()?);

        self.optimistic_pass(&mut state)?;
        if state.changes.merged_indices().is_empty() {
            info!("no change merged; nothing to validate");
            return Ok(Self::report(RunOutcome::NothingMerged, None, state, started_at));
        }

        let combined = self.combined_pass(&mut state, store)?;
        let Verdict::Failed(stage) = combined else {
            return Ok(Self::report(RunOutcome::CombinedPassed, None, state, started_at));
        };

        guard.reset_to_original()?;
        state.begin_pass(self.vcs.head()?);
        self.isolation_pass(&mut state, store, stage)?;
        Ok(Self::report(RunOutcome::Isolated, Some(stage), state, started_at))
    }

    /// Phase 1: merge everything, validate nothing
    fn optimistic_pass(&self, state: &mut OrchestratorState) -> Result<()> {
        self.progress.on_phase(Phase::Optimistic);
        for index in 0..state.changes.len() {
            self.merge_one(state, index)?;
        }
        Ok(())
    }

    /// Phase 2: one validation of the combined tip
    fn combined_pass(&self, state: &mut OrchestratorState, store: &ArtifactStore) -> Result<Verdict> {
        self.progress.on_phase(Phase::Combined);
        let merged = state.changes.merged_indices();
        info!(count = merged.len(), tip = %state.integration.tip, "validating combined changes");

        let verdict = self.runner.validate(store, COMBINED_KEY)?;
        if let Verdict::Failed(stage) = verdict {
            self.progress
                .on_message(&format!("combined {stage} failed; isolating"));
            return Ok(verdict);
        }

        for &index in &merged {
            state.changes.advance(index, ChangeStatus::TestPassed)?;
        }
        self.progress.on_update(&state.changes, None);

        let install = self.runner.install(store, COMBINED_KEY)?;
        if let Some(status) = install_status(install) {
            for &index in &merged {
                state.changes.advance(index, status)?;
            }
            self.progress.on_update(&state.changes, None);
        }
        Ok(verdict)
    }

    /// Phase 3: merge and validate one at a time
    ///
    /// `combined_failure` is the stage the combined run failed at.
    fn isolation_pass(
        &self,
        state: &mut OrchestratorState,
        store: &ArtifactStore,
        combined_failure: Stage,
    ) -> Result<()> {
        self.progress.on_phase(Phase::Isolation);
        // Phase 1 merge failures kept their status through begin_pass
        let candidates: Vec<usize> = state
            .changes
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == ChangeStatus::Pending)
            .map(|(i, _)| i)
            .collect();
        let last = candidates.last().copied();
        let mut saw_failure = false;

        for index in candidates {
            if !self.merge_one(state, index)? {
                continue;
            }
            let change = state.changes.records()[index].change.clone();
            let key = change.artifact_key();

            if Some(index) == last && !saw_failure {
                // Same cumulative state as the combined run, which failed.
                store.copy(COMBINED_KEY, &key)?;
                self.reject(state, index, &change, combined_failure)?;
                continue;
            }

            self.progress.on_update(&state.changes, Some(index));
            match self.runner.validate(store, &key)? {
                Verdict::Passed => {
                    state.changes.advance(index, ChangeStatus::TestPassed)?;
                    self.progress.on_update(&state.changes, Some(index));
                    if let Some(status) = install_status(self.runner.install(store, &key)?) {
                        state.changes.advance(index, status)?;
                    }
                    self.progress.on_update(&state.changes, None);
                }
                Verdict::Failed(stage) => {
                    self.reject(state, index, &change, stage)?;
                    saw_failure = true;
                }
            }
        }
        Ok(())
    }

    /// Try to merge change `index`; returns whether it merged
    fn merge_one(&self, state: &mut OrchestratorState, index: usize) -> Result<bool> {
        self.cancel.check()?;
        let change = state.changes.records()[index].change.clone();
        self.progress.on_update(&state.changes, Some(index));

        let merged = match self.engine.integrate(&change, &mut state.integration)? {
            Integration::Merged { .. } => {
                state.changes.advance(index, ChangeStatus::Merged)?;
                true
            }
            Integration::Conflict { reason } => {
                state.changes.mark_merge_failed(index, reason)?;
                false
            }
        };

        self.progress.on_update(&state.changes, None);
        Ok(merged)
    }

    /// Record a failed validation and take the change off the branch
    fn reject(
        &self,
        state: &mut OrchestratorState,
        index: usize,
        change: &Change,
        stage: Stage,
    ) -> Result<()> {
        state.changes.mark_test_failed(index, stage)?;
        self.engine.drop_tip(change, &mut state.integration)?;
        self.progress.on_update(&state.changes, None);
        self.progress
            .on_message(&format!("{change} failed {stage}; dropped from the branch"));
        Ok(())
    }

    fn report(
        outcome: RunOutcome,
        combined_failure: Option<Stage>,
        state: OrchestratorState,
        started_at: chrono::DateTime<Utc>,
    ) -> RunReport {
        RunReport {
            outcome,
            combined_failure,
            changes: state.changes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

const fn install_status(outcome: InstallOutcome) -> Option<ChangeStatus> {
    match outcome {
        InstallOutcome::Skipped => None,
        InstallOutcome::Passed => Some(ChangeStatus::InstallPassed),
        InstallOutcome::Failed => Some(ChangeStatus::InstallFailed),
    }
}
