//! Progress reporting hooks
//!
//! The orchestrator tells a [`ProgressCallback`] what it is doing; it never
//! reads anything back, so presentation cannot influence the run.

use crate::run::ChangeSet;

/// Orchestration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Merge every change without validating
    Optimistic,
    /// Validate all merged changes together
    Combined,
    /// Re-merge one by one, validating each
    Isolation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimistic => write!(f, "merging"),
            Self::Combined => write!(f, "testing combined"),
            Self::Isolation => write!(f, "isolating failures"),
        }
    }
}

/// Receives progress updates during a run
pub trait ProgressCallback {
    /// A new phase started
    fn on_phase(&self, phase: Phase);

    /// A change's status changed, or a change became in flight
    ///
    /// `in_flight` is the index of the change currently being merged or
    /// validated, if any.
    fn on_update(&self, changes: &ChangeSet, in_flight: Option<usize>);

    /// Free-form status message
    fn on_message(&self, message: &str);
}

/// Progress callback that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: Phase) {}

    fn on_update(&self, _changes: &ChangeSet, _in_flight: Option<usize>) {}

    fn on_message(&self, _message: &str) {}
}
