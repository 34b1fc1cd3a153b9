//! Build-system collaborator
//!
//! One pipeline stage is one invocation of a build target. The orchestrator
//! only looks at the exit status; the captured output goes into the run
//! artifact for the change being validated.

mod command;

pub use command::CommandBuild;

use crate::error::Result;

/// Flags shared by every target invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    /// Parallelism hint passed as `-j N`
    pub jobs: Option<usize>,
    /// Extra arguments placed before the target name
    pub args: Vec<String>,
}

impl BuildFlags {
    /// Command-line arguments for invoking `target`
    pub fn command_args(&self, target: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len() + 3);
        if let Some(jobs) = self.jobs {
            out.push("-j".to_string());
            out.push(jobs.to_string());
        }
        out.extend(self.args.iter().cloned());
        out.push(target.to_string());
        out
    }
}

/// Result of running one build target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRun {
    /// Whether the target exited with status zero
    pub success: bool,
    /// The command line that was run (for the artifact header)
    pub command: String,
    /// Combined stdout and stderr
    pub output: String,
}

/// Runs build targets in the repository
pub trait BuildSystem {
    /// Run `target` to completion with `flags`
    ///
    /// A target that runs and fails is `Ok` with `success == false`; `Err`
    /// means the build tool could not be started at all.
    fn run_target(&self, target: &str, flags: &BuildFlags) -> Result<TargetRun>;
}
