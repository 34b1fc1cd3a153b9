//! `git` command-line implementation of [`Vcs`]

use crate::error::{Error, Result};
use crate::vcs::{SquashOutcome, Vcs};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Runs `git` in a repository directory
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Open the repository containing `path`
    ///
    /// Fails if `path` is not inside a git work tree.
    pub fn open(path: &Path) -> Result<Self> {
        let probe = Self {
            root: path.to_path_buf(),
        };
        let toplevel = probe.run(&["rev-parse", "--show-toplevel"])?;
        Ok(Self {
            root: PathBuf::from(toplevel),
        })
    }

    /// Root of the work tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run git, returning the raw output whatever the exit status
    fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(cwd = %self.root.display(), "git {}", args.join(" "));
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::Git {
                command: args.join(" "),
                message: format!("failed to run git: {e}"),
            })
    }

    /// Run git and return trimmed stdout, failing on non-zero exit
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::Git {
                command: args.join(" "),
                message: failure_message(&output),
            })
        }
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

impl Vcs for GitCli {
    fn current_ref(&self) -> Result<String> {
        let output = self.output(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        // Detached HEAD
        self.head()
    }

    fn head(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    fn is_clean(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(status.is_empty())
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "-B", name, start])?;
        Ok(())
    }

    fn fetch_and_squash(
        &self,
        remote: &str,
        refspec: &str,
        ff_only: bool,
    ) -> Result<SquashOutcome> {
        let fetch = self.output(&["fetch", "--quiet", remote, refspec])?;
        if !fetch.status.success() {
            return Ok(SquashOutcome::Conflict(format!(
                "fetch {remote} {refspec}: {}",
                failure_message(&fetch)
            )));
        }

        let mut args = vec!["merge", "--quiet", "--squash"];
        if ff_only {
            args.push("--ff-only");
        }
        args.push("FETCH_HEAD");

        let merge = self.output(&args)?;
        if merge.status.success() {
            Ok(SquashOutcome::Clean)
        } else {
            Ok(SquashOutcome::Conflict(failure_message(&merge)))
        }
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run(&[
            "commit",
            "--quiet",
            "--no-verify",
            "--allow-empty",
            "-m",
            message,
        ])?;
        Ok(())
    }

    fn abort_merge(&self) -> Result<()> {
        // Squash merges leave no MERGE_HEAD, so `merge --abort` may refuse;
        // the hard reset below is what actually clears the state.
        let _ = self.output(&["merge", "--abort"])?;
        self.run(&["reset", "--quiet", "--hard", "HEAD"])?;
        Ok(())
    }

    fn reset_hard(&self, offset: usize) -> Result<()> {
        let target = format!("HEAD~{offset}");
        self.run(&["reset", "--quiet", "--hard", &target])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.run(&["branch", "--quiet", "-D", name])?;
        Ok(())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        let full = format!("refs/heads/{name}");
        let output = self.output(&["rev-parse", "--verify", "--quiet", &full])?;
        Ok(output.status.success())
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", reference])?;
        Ok(())
    }
}
