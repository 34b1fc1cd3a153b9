//! Error types for prgate

use thiserror::Error;

/// Errors that abort a run
///
/// Per-change failures (merge conflicts, failing tests) are not errors: they
/// are recorded as status transitions on the change set. Everything here
/// ends the run, after the resource guard has restored the repository.
#[derive(Debug, Error)]
pub enum Error {
    /// The working tree has uncommitted changes to tracked files
    #[error("working tree has uncommitted changes; commit or stash them first")]
    DirtyWorkingTree,

    /// HEAD is on the scratch branch, left behind by a killed run
    #[error("scratch branch '{0}' is checked out; check out another branch first")]
    ScratchBranchCheckedOut(String),

    /// A git command failed outside of a per-change merge attempt
    #[error("git {command} failed: {message}")]
    Git {
        /// The git subcommand and arguments
        command: String,
        /// stderr of the failed command
        message: String,
    },

    /// The build tool could not be started
    #[error("build tool error: {0}")]
    Build(String),

    /// Filesystem error (artifact storage, config files)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A change identity on the command line could not be parsed
    #[error("invalid change '{0}': expected a number, #number, or pull request URL")]
    InvalidChange(String),

    /// The run was interrupted (Ctrl-C)
    #[error("interrupted")]
    Interrupted,

    /// Broken internal invariant
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for prgate
pub type Result<T> = std::result::Result<T, Error>;
