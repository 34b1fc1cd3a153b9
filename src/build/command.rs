//! Build targets run as an external command (`make` by default)

use crate::build::{BuildFlags, BuildSystem, TargetRun};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs `<tool> [-j N] [args...] <target>` in a directory
#[derive(Debug, Clone)]
pub struct CommandBuild {
    tool: String,
    dir: PathBuf,
}

impl CommandBuild {
    /// Create a runner for `tool` working in `dir`
    pub fn new(tool: impl Into<String>, dir: &Path) -> Self {
        Self {
            tool: tool.into(),
            dir: dir.to_path_buf(),
        }
    }
}

impl BuildSystem for CommandBuild {
    fn run_target(&self, target: &str, flags: &BuildFlags) -> Result<TargetRun> {
        let args = flags.command_args(target);
        let command = format!("{} {}", self.tool, args.join(" "));
        debug!(cwd = %self.dir.display(), "{command}");

        let output = Command::new(&self.tool)
            .args(&args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| Error::Build(format!("failed to run '{}': {e}", self.tool)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!(target, success = output.status.success(), "target finished");

        Ok(TargetRun {
            success: output.status.success(),
            command,
            output: combined,
        })
    }
}
