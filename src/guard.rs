//! Resource guard for a run
//!
//! Owns everything a run mutates outside of the process: the scratch
//! integration branch and the artifact directory. Creating the guard checks
//! out the scratch branch; [`ResourceGuard::cleanup`] puts the repository
//! back on the reference that was checked out before, deletes the scratch
//! branch and disposes of the artifacts. Cleanup is idempotent and also runs
//! from `Drop`, so early returns and panics restore the repository too.

use crate::artifacts::ArtifactStore;
use crate::error::{Error, Result};
use crate::vcs::Vcs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Failure logs to keep after cleanup
#[derive(Debug, Clone)]
struct PersistRequest {
    dest: PathBuf,
    keys: Vec<String>,
}

/// Scoped owner of the scratch branch and artifact storage
pub struct ResourceGuard<'a> {
    vcs: &'a dyn Vcs,
    original_ref: String,
    scratch_branch: String,
    artifacts: Option<ArtifactStore>,
    persist: Option<PersistRequest>,
    persisted: Vec<PathBuf>,
    repo_restored: bool,
}

impl<'a> ResourceGuard<'a> {
    /// Record the checked-out reference and switch to a fresh scratch branch
    ///
    /// A scratch branch with the same name left behind by a killed run is
    /// replaced, unless it is still checked out: then there is no original
    /// reference to return to and the run is refused.
    pub fn acquire(vcs: &'a dyn Vcs, scratch_branch: &str) -> Result<Self> {
        let original_ref = vcs.current_ref()?;
        if original_ref == scratch_branch {
            return Err(Error::ScratchBranchCheckedOut(original_ref));
        }
        let artifacts = ArtifactStore::new()?;
        // Not restored from the start: if the checkout below fails halfway,
        // dropping the guard still undoes it.
        let guard = Self {
            vcs,
            original_ref,
            scratch_branch: scratch_branch.to_string(),
            artifacts: Some(artifacts),
            persist: None,
            persisted: Vec::new(),
            repo_restored: false,
        };

        vcs.create_branch(&guard.scratch_branch, &guard.original_ref)?;
        info!(
            original = %guard.original_ref,
            scratch = %guard.scratch_branch,
            "checked out scratch branch"
        );
        Ok(guard)
    }

    /// Reference that was checked out when the guard was acquired
    pub fn original_ref(&self) -> &str {
        &self.original_ref
    }

    /// Name of the scratch integration branch
    pub fn scratch_branch(&self) -> &str {
        &self.scratch_branch
    }

    /// Artifact storage, `None` once cleanup has disposed of it
    pub fn artifacts(&self) -> Option<&ArtifactStore> {
        self.artifacts.as_ref()
    }

    /// Point the scratch branch back at the original reference
    ///
    /// Discards every commit integrated so far.
    pub fn reset_to_original(&self) -> Result<()> {
        if self.on_scratch_branch()? {
            self.vcs.abort_merge()?;
        }
        self.vcs
            .create_branch(&self.scratch_branch, &self.original_ref)?;
        debug!(scratch = %self.scratch_branch, "scratch branch reset to original");
        Ok(())
    }

    /// Keep the logs for `keys` by copying them to `dest` during cleanup
    pub fn persist_to(&mut self, dest: &Path, keys: Vec<String>) {
        self.persist = Some(PersistRequest {
            dest: dest.to_path_buf(),
            keys,
        });
    }

    /// Paths written by the persist step of cleanup
    pub fn persisted(&self) -> &[PathBuf] {
        &self.persisted
    }

    /// Abort any merge, check out the original reference, delete the
    /// scratch branch. Safe to call any number of times.
    pub fn restore_repository(&mut self) -> Result<()> {
        if self.repo_restored {
            return Ok(());
        }

        if self.on_scratch_branch()? {
            self.vcs.abort_merge()?;
        }
        self.vcs.checkout(&self.original_ref)?;
        if self.vcs.branch_exists(&self.scratch_branch)? {
            self.vcs.delete_branch(&self.scratch_branch)?;
        }

        self.repo_restored = true;
        info!(reference = %self.original_ref, "repository restored");
        Ok(())
    }

    /// Restore the repository and dispose of the artifact storage
    ///
    /// Requested failure logs are copied out before the storage is removed.
    /// Safe to call any number of times.
    pub fn cleanup(&mut self) -> Result<()> {
        self.restore_repository()?;

        if let Some(store) = self.artifacts.take() {
            if let Some(request) = self.persist.take() {
                self.persisted = store.persist(&request.keys, &request.dest)?;
                debug!(count = self.persisted.len(), dest = %request.dest.display(), "logs persisted");
            }
            store.close()?;
        }
        Ok(())
    }

    /// Whether cleanup has fully completed
    pub fn is_clean(&self) -> bool {
        self.repo_restored && self.artifacts.is_none()
    }

    fn on_scratch_branch(&self) -> Result<bool> {
        Ok(self.vcs.current_ref()? == self.scratch_branch)
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        if self.is_clean() {
            return;
        }
        if let Err(e) = self.cleanup() {
            warn!(
                error = %e,
                original = %self.original_ref,
                scratch = %self.scratch_branch,
                "cleanup failed; check out the original reference and delete the scratch branch by hand"
            );
        }
    }
}

impl std::fmt::Debug for ResourceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("original_ref", &self.original_ref)
            .field("scratch_branch", &self.scratch_branch)
            .field("repo_restored", &self.repo_restored)
            .finish_non_exhaustive()
    }
}
