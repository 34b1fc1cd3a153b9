//! Shared test fixtures
//!
//! These are test utilities - not every test binary uses all of them.

#![allow(dead_code)]

mod mock_build;
mod mock_vcs;
mod temp_git;

pub use mock_build::{MockBuild, TargetCall};
pub use mock_vcs::{MAIN, MockRepo};
pub use temp_git::{TempGitRepo, git, git_available};

use prgate::build::BuildFlags;
use prgate::cancel::CancelToken;
use prgate::config::Targets;
use prgate::error::Result;
use prgate::guard::ResourceGuard;
use prgate::integrate::IntegrationEngine;
use prgate::progress::{Phase, ProgressCallback};
use prgate::run::{ChangeSet, Orchestrator, RunReport};
use prgate::types::Change;
use prgate::validate::ValidationRunner;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Scratch branch used by the orchestrator tests
pub const SCRATCH: &str = "prgate/integration";

/// Changes with GitHub-style refspecs
pub fn make_changes(ids: &[u64]) -> Vec<Change> {
    ids.iter()
        .map(|&id| Change::new(id, "pull/{id}/head"))
        .collect()
}

/// Targets with only clean and test
pub fn basic_targets() -> Targets {
    Targets::default()
}

/// Targets with every stage configured
pub fn full_targets() -> Targets {
    Targets {
        clean: "clean".to_string(),
        build: Some("all".to_string()),
        test: "check".to_string(),
        install: Some("install".to_string()),
    }
}

/// Repository and build system sharing one history
pub fn mock_pair() -> (Arc<MockRepo>, MockBuild) {
    let repo = Arc::new(MockRepo::new());
    let build = MockBuild::new(Arc::clone(&repo));
    (repo, build)
}

/// Progress callback that records what it was told
#[derive(Default)]
pub struct RecordingProgress {
    phases: Mutex<Vec<Phase>>,
    messages: Mutex<Vec<String>>,
    updates: Mutex<usize>,
}

impl RecordingProgress {
    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_update(&self, _changes: &ChangeSet, _in_flight: Option<usize>) {
        *self.updates.lock().unwrap() += 1;
    }

    fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// What a batch run left behind
pub struct BatchRun {
    pub report: RunReport,
    /// Artifact contents by key, read before cleanup
    pub logs: HashMap<String, String>,
}

/// Run `ids` through the orchestrator the way the CLI does, cleaning up after
pub fn run_batch(
    repo: &MockRepo,
    build: &MockBuild,
    targets: Targets,
    ids: &[u64],
    cancel: &CancelToken,
    progress: &dyn ProgressCallback,
) -> Result<BatchRun> {
    let changes = make_changes(ids);
    let engine = IntegrationEngine::new(repo, "origin", false);
    let runner = ValidationRunner::new(build, targets, BuildFlags::default(), cancel);
    let orchestrator = Orchestrator::new(repo, engine, runner, progress, cancel);

    let mut guard = ResourceGuard::acquire(repo, SCRATCH)?;
    let outcome = orchestrator.run(&changes, &guard);

    let mut logs = HashMap::new();
    if let Some(store) = guard.artifacts() {
        let keys = changes
            .iter()
            .map(Change::artifact_key)
            .chain(std::iter::once(prgate::artifacts::COMBINED_KEY.to_string()));
        for key in keys {
            if let Some(log) = store.read(&key)? {
                logs.insert(key, log);
            }
        }
    }

    guard.cleanup()?;
    Ok(BatchRun {
        report: outcome?,
        logs,
    })
}
