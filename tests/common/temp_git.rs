//! Throwaway git repositories for end-to-end tests
//!
//! `origin` is a plain repository whose changes live under
//! `refs/pull/<n>/head`, the way hosting services expose pull requests.
//! `work` is a clone of it where prgate runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Build script used as the build tool: `sh ci.sh <target>`
///
/// `check` fails while a file named `broken` exists.
const CI_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  clean) echo "cleaning" ;;
  check)
    if [ -f broken ]; then
      echo "check failed: broken is present"
      exit 1
    fi
    echo "all checks passed"
    ;;
  *) echo "unknown target $1"; exit 2 ;;
esac
"#;

/// Whether a `git` executable is available
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Run git in `dir`, panicking on failure, and return trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A remote with pull request refs and a working clone
pub struct TempGitRepo {
    temp: TempDir,
    origin: PathBuf,
    work: Option<PathBuf>,
}

impl TempGitRepo {
    /// Origin with one commit on `main` holding the build script
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let origin = temp.path().join("origin");
        fs::create_dir(&origin).expect("failed to create origin dir");

        git(&origin, &["init", "--quiet"]);
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        configure_identity(&origin);
        fs::write(origin.join("ci.sh"), CI_SCRIPT).expect("failed to write ci.sh");
        fs::write(origin.join("README"), "base\n").expect("failed to write README");
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "--quiet", "-m", "base"]);

        Self {
            temp,
            origin,
            work: None,
        }
    }

    /// Publish change `id` as `refs/pull/<id>/head`, branched from `main`
    ///
    /// `files` are written (relative to the repository root) and committed.
    pub fn add_change(&self, id: u64, files: &[(&str, &str)]) {
        let branch = format!("change-{id}");
        git(&self.origin, &["checkout", "--quiet", "-b", &branch, "main"]);
        for (name, contents) in files {
            fs::write(self.origin.join(name), contents).expect("failed to write change file");
        }
        git(&self.origin, &["add", "."]);
        git(
            &self.origin,
            &["commit", "--quiet", "-m", &format!("change {id}")],
        );
        let pull_ref = format!("refs/pull/{id}/head");
        git(&self.origin, &["update-ref", &pull_ref, "HEAD"]);
        git(&self.origin, &["checkout", "--quiet", "main"]);
    }

    /// Clone origin into `work`; call after adding changes
    pub fn clone_work(&mut self) -> PathBuf {
        let work = self.temp.path().join("work");
        git(
            self.temp.path(),
            &["clone", "--quiet", "origin", "work"],
        );
        configure_identity(&work);
        self.work = Some(work.clone());
        work
    }

    /// Working clone
    pub fn work(&self) -> &Path {
        self.work.as_deref().expect("clone_work not called")
    }

    /// Scratch directory for config and logs
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Branch checked out in the working clone
    pub fn current_branch(&self) -> String {
        git(self.work(), &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Commit id of `reference` in the working clone
    pub fn rev(&self, reference: &str) -> String {
        git(self.work(), &["rev-parse", reference])
    }

    /// Whether a local branch exists in the working clone
    pub fn has_branch(&self, name: &str) -> bool {
        !git(self.work(), &["branch", "--list", name]).is_empty()
    }

    /// `git status --porcelain` of the working clone
    pub fn status(&self) -> String {
        git(self.work(), &["status", "--porcelain"])
    }
}
