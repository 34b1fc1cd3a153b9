//! Validation runner: clean → build → test, then optionally install
//!
//! Stages run in a fixed order and the chain stops at the first failure.
//! Every stage's output lands in the artifact for the key being validated.
//! Install runs separately and only records an outcome; it never changes
//! the verdict.

use crate::artifacts::ArtifactStore;
use crate::build::{BuildFlags, BuildSystem};
use crate::cancel::CancelToken;
use crate::config::Targets;
use crate::error::Result;
use crate::types::Stage;
use tracing::{debug, info};

/// Outcome of the clean/build/test chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every stage succeeded
    Passed,
    /// The chain stopped at this stage
    Failed(Stage),
}

impl Verdict {
    /// Whether the chain passed
    pub const fn passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Outcome of the install stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No install target configured
    Skipped,
    /// Install succeeded
    Passed,
    /// Install failed
    Failed,
}

/// Runs the configured pipeline through a build system
pub struct ValidationRunner<'a> {
    build: &'a dyn BuildSystem,
    targets: Targets,
    flags: BuildFlags,
    cancel: &'a CancelToken,
}

impl<'a> ValidationRunner<'a> {
    /// Create a runner
    pub const fn new(
        build: &'a dyn BuildSystem,
        targets: Targets,
        flags: BuildFlags,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            build,
            targets,
            flags,
            cancel,
        }
    }

    /// Stages of the verdict chain, in order, with their targets
    ///
    /// The build stage is left out when no build target is configured.
    pub fn stages(&self) -> Vec<(Stage, &str)> {
        let mut stages = vec![(Stage::Clean, self.targets.clean.as_str())];
        if let Some(build) = self.targets.build.as_deref() {
            stages.push((Stage::Build, build));
        }
        stages.push((Stage::Test, self.targets.test.as_str()));
        stages
    }

    /// Whether an install target is configured
    pub const fn has_install(&self) -> bool {
        self.targets.install.is_some()
    }

    /// Run clean/build/test on the checked-out tree
    ///
    /// Any earlier output for `key` is discarded first. Returns
    /// `Err(Interrupted)` if cancellation is observed before or after a
    /// stage.
    pub fn validate(&self, store: &ArtifactStore, key: &str) -> Result<Verdict> {
        store.begin(key)?;
        for (stage, target) in self.stages() {
            if !self.run_stage(store, key, stage, target)? {
                info!(key, %stage, "validation failed");
                return Ok(Verdict::Failed(stage));
            }
        }
        info!(key, "validation passed");
        Ok(Verdict::Passed)
    }

    /// Run the install target, appending to the artifact for `key`
    pub fn install(&self, store: &ArtifactStore, key: &str) -> Result<InstallOutcome> {
        let Some(target) = self.targets.install.as_deref() else {
            return Ok(InstallOutcome::Skipped);
        };
        if self.run_stage(store, key, Stage::Install, target)? {
            Ok(InstallOutcome::Passed)
        } else {
            info!(key, "install failed");
            Ok(InstallOutcome::Failed)
        }
    }

    fn run_stage(&self, store: &ArtifactStore, key: &str, stage: Stage, target: &str) -> Result<bool> {
        self.cancel.check()?;
        debug!(key, %stage, target, "running stage");
        let run = self.build.run_target(target, &self.flags)?;
        // A stage killed by the interrupt says nothing about the change.
        self.cancel.check()?;
        store.append(key, &format!("{stage}: {}", run.command), &run.output)?;
        Ok(run.success)
    }
}
