//! Build system double that decides pass or fail from the checked-out history

use super::MockRepo;
use prgate::build::{BuildFlags, BuildSystem, TargetRun};
use prgate::cancel::CancelToken;
use prgate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Call record for `run_target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCall {
    pub target: String,
    /// Changes on the checked-out branch when the target ran
    pub applied: Vec<u64>,
}

/// Mock build system
///
/// A target fails when the checked-out branch contains a change registered
/// as breaking it, or when the target is registered as always failing.
pub struct MockBuild {
    repo: Arc<MockRepo>,
    breakers: Mutex<HashMap<String, HashSet<u64>>>,
    always_fail: Mutex<HashSet<String>>,
    missing_tool: Mutex<bool>,
    cancel_on: Mutex<Option<(String, CancelToken)>>,
    calls: Mutex<Vec<TargetCall>>,
}

impl MockBuild {
    /// Build system reading history from `repo`
    pub fn new(repo: Arc<MockRepo>) -> Self {
        Self {
            repo,
            breakers: Mutex::new(HashMap::new()),
            always_fail: Mutex::new(HashSet::new()),
            missing_tool: Mutex::new(false),
            cancel_on: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `target` fails whenever change `id` is applied
    pub fn breaks(&self, target: &str, id: u64) {
        self.breakers
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .insert(id);
    }

    /// `target` fails no matter what is applied
    pub fn always_fails(&self, target: &str) {
        self.always_fail.lock().unwrap().insert(target.to_string());
    }

    /// Behave as if the build tool is not installed
    pub fn set_missing_tool(&self) {
        *self.missing_tool.lock().unwrap() = true;
    }

    /// Cancel `token` while `target` runs, like a Ctrl-C mid-build
    pub fn cancel_during(&self, target: &str, token: CancelToken) {
        *self.cancel_on.lock().unwrap() = Some((target.to_string(), token));
    }

    /// Every target run, in order
    pub fn calls(&self) -> Vec<TargetCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Histories `target` ran against, in order
    pub fn runs_of(&self, target: &str) -> Vec<Vec<u64>> {
        self.calls()
            .into_iter()
            .filter(|c| c.target == target)
            .map(|c| c.applied)
            .collect()
    }
}

impl BuildSystem for MockBuild {
    fn run_target(&self, target: &str, flags: &BuildFlags) -> Result<TargetRun> {
        if *self.missing_tool.lock().unwrap() {
            return Err(Error::Build("failed to run mock: not found".to_string()));
        }

        let applied = self.repo.applied();
        self.calls.lock().unwrap().push(TargetCall {
            target: target.to_string(),
            applied: applied.clone(),
        });

        if let Some((on, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if on == target {
                token.cancel();
            }
        }

        let broken_by: Vec<u64> = self
            .breakers
            .lock()
            .unwrap()
            .get(target)
            .map(|ids| applied.iter().copied().filter(|id| ids.contains(id)).collect())
            .unwrap_or_default();
        let success =
            broken_by.is_empty() && !self.always_fail.lock().unwrap().contains(target);

        let output = if success {
            format!("{target}: ok with {applied:?}\n")
        } else {
            format!("{target}: error, broken by {broken_by:?} in {applied:?}\n")
        };

        Ok(TargetRun {
            success,
            command: format!("mock {}", flags.command_args(target).join(" ")),
            output,
        })
    }
}
