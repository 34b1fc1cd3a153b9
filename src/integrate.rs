//! Integration engine: put one change on top of the scratch branch

use crate::error::{Error, Result};
use crate::run::IntegrationState;
use crate::types::Change;
use crate::vcs::{SquashOutcome, Vcs};
use tracing::{debug, info};

/// Result of one integration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integration {
    /// The change is now the newest commit on the branch
    Merged {
        /// New tip of the scratch branch
        tip: String,
    },
    /// The change could not be merged; the branch is unchanged
    Conflict {
        /// Message from the version-control system
        reason: String,
    },
}

/// Fetches changes from a remote and squashes them onto the scratch branch
pub struct IntegrationEngine<'a> {
    vcs: &'a dyn Vcs,
    remote: String,
    ff_only: bool,
}

impl<'a> IntegrationEngine<'a> {
    /// Engine fetching from `remote`
    pub fn new(vcs: &'a dyn Vcs, remote: impl Into<String>, ff_only: bool) -> Self {
        Self {
            vcs,
            remote: remote.into(),
            ff_only,
        }
    }

    /// Commit message labelling a squashed change
    pub fn commit_message(&self, change: &Change) -> String {
        format!("prgate: squash change {change} from {}", self.remote)
    }

    /// Squash `change` onto the tip recorded in `state`
    ///
    /// On conflict the attempt is fully reverted and `state` is untouched.
    /// On success `state` gets the new tip and the change is recorded as
    /// applied.
    pub fn integrate(&self, change: &Change, state: &mut IntegrationState) -> Result<Integration> {
        let head = self.vcs.head()?;
        if head != state.tip {
            return Err(Error::Internal(format!(
                "scratch branch moved: expected {}, found {head}",
                state.tip
            )));
        }

        debug!(%change, refspec = %change.refspec, remote = %self.remote, "integrating");
        match self
            .vcs
            .fetch_and_squash(&self.remote, &change.refspec, self.ff_only)?
        {
            SquashOutcome::Clean => {
                self.vcs.commit(&self.commit_message(change))?;
                let tip = self.vcs.head()?;
                state.tip.clone_from(&tip);
                state.applied.push(change.id);
                info!(%change, %tip, "merged");
                Ok(Integration::Merged { tip })
            }
            SquashOutcome::Conflict(reason) => {
                self.vcs.abort_merge()?;
                info!(%change, %reason, "merge failed");
                Ok(Integration::Conflict { reason })
            }
        }
    }

    /// Remove the most recently applied change's commit from the branch
    pub fn drop_tip(&self, change: &Change, state: &mut IntegrationState) -> Result<()> {
        if state.applied.last() != Some(&change.id) {
            return Err(Error::Internal(format!(
                "cannot drop {change}: it is not the newest commit on the scratch branch"
            )));
        }
        self.vcs.reset_hard(1)?;
        state.applied.pop();
        state.tip = self.vcs.head()?;
        debug!(%change, tip = %state.tip, "dropped commit");
        Ok(())
    }
}
