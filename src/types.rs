//! Core types for prgate

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Placeholder in the change refspec template replaced by the change number
pub const CHANGE_ID_PLACEHOLDER: &str = "{id}";

static CHANGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:pull|pulls|merge_requests)/(\d+)(?:/.*)?$")
        .unwrap_or_else(|e| unreachable!("static regex is valid: {e}"))
});

/// A proposed change (pull request) to integrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Change number on the remote
    pub id: u64,
    /// Refspec to fetch the change from the remote (e.g. `pull/12/head`)
    pub refspec: String,
}

impl Change {
    /// Create a change, expanding `{id}` in the refspec template
    pub fn new(id: u64, refspec_template: &str) -> Self {
        Self {
            id,
            refspec: refspec_template.replace(CHANGE_ID_PLACEHOLDER, &id.to_string()),
        }
    }

    /// Artifact key for this change's validation output
    pub fn artifact_key(&self) -> String {
        self.id.to_string()
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// Parse a change identity given on the command line
///
/// Accepts `123`, `#123`, and pull/merge request URLs such as
/// `https://github.com/o/r/pull/123`.
pub fn parse_change_id(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if let Ok(id) = digits.parse::<u64>() {
        return Ok(id);
    }

    CHANGE_URL
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| Error::InvalidChange(input.to_string()))
}

/// Build the ordered batch from command-line identities
///
/// Order is preserved; the same change given twice is rejected.
pub fn parse_changes(inputs: &[String], refspec_template: &str) -> Result<Vec<Change>> {
    let mut changes: Vec<Change> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let id = parse_change_id(input)?;
        if changes.iter().any(|c| c.id == id) {
            return Err(Error::InvalidChange(format!("{input} (given more than once)")));
        }
        changes.push(Change::new(id, refspec_template));
    }
    Ok(changes)
}

/// Per-change status within one orchestration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Not processed yet in this pass
    Pending,
    /// Could not be merged onto the integration tip
    MergeFailed,
    /// Merged, not validated yet
    Merged,
    /// Merged and the pipeline passed
    TestPassed,
    /// Merged but the pipeline failed; its commit was dropped
    TestFailed,
    /// Accepted, and the install target succeeded
    InstallPassed,
    /// Accepted, but the install target failed
    InstallFailed,
}

impl ChangeStatus {
    /// Whether `next` is a legal forward transition from this status
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::MergeFailed | Self::Merged)
                | (Self::Merged, Self::TestPassed | Self::TestFailed)
                | (Self::TestPassed, Self::InstallPassed | Self::InstallFailed)
        )
    }

    /// Whether the change made it into the accepted set
    pub const fn is_accepted(self) -> bool {
        matches!(
            self,
            Self::TestPassed | Self::InstallPassed | Self::InstallFailed
        )
    }

    /// Whether the change's merge succeeded
    pub const fn is_merged(self) -> bool {
        !matches!(self, Self::Pending | Self::MergeFailed)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::MergeFailed => write!(f, "merge failed"),
            Self::Merged => write!(f, "merged (untested)"),
            Self::TestPassed => write!(f, "test passed"),
            Self::TestFailed => write!(f, "test failed"),
            Self::InstallPassed => write!(f, "install passed"),
            Self::InstallFailed => write!(f, "install failed"),
        }
    }
}

/// A build pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Remove previous build output
    Clean,
    /// Build (optional)
    Build,
    /// Run the test suite
    Test,
    /// Install (observational only)
    Install,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
            Self::Install => write!(f, "install"),
        }
    }
}
