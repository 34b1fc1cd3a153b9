//! Version-control collaborator
//!
//! The orchestrator only needs a handful of repository operations; they are
//! abstracted here so the algorithm can be driven against a real `git`
//! checkout or an in-memory double in tests.

mod git;

pub use git::GitCli;

use crate::error::Result;

/// Outcome of fetching a change and squash-merging it into the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquashOutcome {
    /// Changes are staged, ready to commit
    Clean,
    /// The merge could not be performed (conflict, missing ref, refused
    /// fast-forward). The repository may hold a partial merge that the
    /// caller must abort.
    Conflict(String),
}

/// Repository operations used by the integration engine and resource guard
pub trait Vcs {
    /// Currently checked-out reference: branch name, or commit id when detached
    fn current_ref(&self) -> Result<String>;

    /// Commit id of `HEAD`
    fn head(&self) -> Result<String>;

    /// Whether tracked files have no uncommitted modifications
    fn is_clean(&self) -> Result<bool>;

    /// Create (or reset) branch `name` at `start` and check it out
    fn create_branch(&self, name: &str, start: &str) -> Result<()>;

    /// Fetch `refspec` from `remote` and squash-merge it into the index
    fn fetch_and_squash(&self, remote: &str, refspec: &str, ff_only: bool)
    -> Result<SquashOutcome>;

    /// Commit the staged changes (empty commits allowed)
    fn commit(&self, message: &str) -> Result<()>;

    /// Abandon any in-progress merge and discard uncommitted changes
    fn abort_merge(&self) -> Result<()>;

    /// Hard-reset the current branch to `HEAD~offset`
    fn reset_hard(&self, offset: usize) -> Result<()>;

    /// Delete a local branch
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Whether a local branch exists
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Check out a branch or commit
    fn checkout(&self, reference: &str) -> Result<()>;
}
