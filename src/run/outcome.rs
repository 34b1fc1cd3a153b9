//! Final record of a run

use crate::artifacts::COMBINED_KEY;
use crate::run::ChangeSet;
use crate::types::{Change, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No change could be merged; nothing was validated
    NothingMerged,
    /// All merged changes passed together
    CombinedPassed,
    /// The combined run failed and changes were validated one by one
    Isolated,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingMerged => write!(f, "nothing merged"),
            Self::CombinedPassed => write!(f, "combined run passed"),
            Self::Isolated => write!(f, "failures isolated"),
        }
    }
}

/// Result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Failing stage of the combined run, when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_failure: Option<Stage>,
    /// Final status of every change, in batch order
    pub changes: ChangeSet,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Changes in the accepted set
    pub fn accepted(&self) -> Vec<&Change> {
        self.changes.accepted()
    }

    /// Whether anything counts as a failure for the exit status
    ///
    /// Install failures don't count.
    pub fn has_failures(&self) -> bool {
        self.outcome == RunOutcome::NothingMerged
            || !self.changes.merge_failed().is_empty()
            || !self.changes.test_failed().is_empty()
    }

    /// Artifact keys worth keeping: every test-failed change, plus the
    /// combined run when it failed
    pub fn failure_artifact_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .changes
            .test_failed()
            .iter()
            .map(|c| c.artifact_key())
            .collect();
        if self.combined_failure.is_some() {
            keys.push(COMBINED_KEY.to_string());
        }
        keys
    }
}
