//! Run state: the change set and the integration branch bookkeeping
//!
//! Pure data, no I/O. Phase functions take an `OrchestratorState` and
//! advance it; status transitions are checked so a change never regresses
//! within a pass.

use crate::error::{Error, Result};
use crate::types::{Change, ChangeStatus, Stage};
use serde::{Deserialize, Serialize};

/// One change and what happened to it in the current pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The change
    pub change: Change,
    /// Current status
    pub status: ChangeStatus,
    /// Stage that failed, for `TestFailed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    /// Why the merge failed, for `MergeFailed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_error: Option<String>,
}

impl ChangeRecord {
    fn new(change: Change) -> Self {
        Self {
            change,
            status: ChangeStatus::Pending,
            failed_stage: None,
            merge_error: None,
        }
    }
}

/// The ordered batch of changes with per-change status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Create a change set with every change pending
    pub fn new(changes: &[Change]) -> Self {
        Self {
            records: changes.iter().cloned().map(ChangeRecord::new).collect(),
        }
    }

    /// Number of changes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in batch order
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Record at `index`
    pub fn get(&self, index: usize) -> Option<&ChangeRecord> {
        self.records.get(index)
    }

    /// Reset every change to `Pending` for a new pass
    ///
    /// Changes that failed to merge stay `MergeFailed` with their reason:
    /// they are out of the run for good.
    pub fn begin_pass(&mut self) {
        for record in &mut self.records {
            if record.status == ChangeStatus::MergeFailed {
                continue;
            }
            record.status = ChangeStatus::Pending;
            record.failed_stage = None;
            record.merge_error = None;
        }
    }

    /// Move change `index` forward to `status`
    pub fn advance(&mut self, index: usize, status: ChangeStatus) -> Result<()> {
        let record = self
            .records
            .get_mut(index)
            .ok_or_else(|| Error::Internal(format!("no change at index {index}")))?;
        if !record.status.can_advance_to(status) {
            return Err(Error::Internal(format!(
                "change {} cannot go from {} to {}",
                record.change, record.status, status
            )));
        }
        record.status = status;
        Ok(())
    }

    /// Mark change `index` as not mergeable
    pub fn mark_merge_failed(&mut self, index: usize, reason: String) -> Result<()> {
        self.advance(index, ChangeStatus::MergeFailed)?;
        self.records[index].merge_error = Some(reason);
        Ok(())
    }

    /// Mark change `index` as failing the pipeline at `stage`
    pub fn mark_test_failed(&mut self, index: usize, stage: Stage) -> Result<()> {
        self.advance(index, ChangeStatus::TestFailed)?;
        self.records[index].failed_stage = Some(stage);
        Ok(())
    }

    /// Indices of changes whose merge succeeded in this pass
    pub fn merged_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status.is_merged())
            .map(|(i, _)| i)
            .collect()
    }

    /// Changes in the accepted set
    pub fn accepted(&self) -> Vec<&Change> {
        self.with(ChangeStatus::is_accepted)
    }

    /// Changes that could not be merged
    pub fn merge_failed(&self) -> Vec<&Change> {
        self.with(|s| s == ChangeStatus::MergeFailed)
    }

    /// Changes that failed validation
    pub fn test_failed(&self) -> Vec<&Change> {
        self.with(|s| s == ChangeStatus::TestFailed)
    }

    /// Accepted changes whose install target failed
    pub fn install_failed(&self) -> Vec<&Change> {
        self.with(|s| s == ChangeStatus::InstallFailed)
    }

    fn with(&self, pred: impl Fn(ChangeStatus) -> bool) -> Vec<&Change> {
        self.records
            .iter()
            .filter(|r| pred(r.status))
            .map(|r| &r.change)
            .collect()
    }
}

/// The scratch branch as the orchestrator sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationState {
    /// Commit id at the tip of the scratch branch
    pub tip: String,
    /// Changes whose commits are on the branch, oldest first
    pub applied: Vec<u64>,
}

impl IntegrationState {
    /// Fresh state at `tip` with nothing applied
    pub const fn new(tip: String) -> Self {
        Self {
            tip,
            applied: Vec::new(),
        }
    }
}

/// Everything a phase reads and writes
#[derive(Debug, Clone)]
pub struct OrchestratorState {
    /// Per-change status
    pub changes: ChangeSet,
    /// Scratch branch bookkeeping
    pub integration: IntegrationState,
}

impl OrchestratorState {
    /// Initial state for `changes` with the branch at `tip`
    pub fn new(changes: &[Change], tip: String) -> Self {
        Self {
            changes: ChangeSet::new(changes),
            integration: IntegrationState::new(tip),
        }
    }

    /// Start a new pass from `tip`: every change pending, nothing applied
    pub fn begin_pass(&mut self, tip: String) {
        self.changes.begin_pass();
        self.integration = IntegrationState::new(tip);
    }
}
