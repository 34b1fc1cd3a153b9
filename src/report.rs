//! Status presentation
//!
//! Maps change statuses to glyphs and builds the one-line progress string
//! and the end-of-run summary. Nothing here feeds back into the run.

use crate::run::{ChangeSet, RunReport};
use crate::types::{Change, ChangeStatus};

/// Glyph for a step that hasn't happened
pub const GLYPH_PENDING: char = '·';
/// Glyph for a step that succeeded
pub const GLYPH_PASSED: char = '✓';
/// Glyph for a step that failed
pub const GLYPH_FAILED: char = '✗';
/// Glyph for a merged but untested change
pub const GLYPH_UNTESTED: char = '?';
/// Marker in front of the change in flight
pub const IN_FLIGHT_MARKER: char = '▸';

/// Merge, test and install glyphs for one change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    /// Merge step
    pub merge: char,
    /// Test step
    pub test: char,
    /// Install step
    pub install: char,
}

impl std::fmt::Display for Glyphs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.merge, self.test, self.install)
    }
}

/// Glyph triple for a status
pub const fn glyphs(status: ChangeStatus) -> Glyphs {
    let merge = match status {
        ChangeStatus::Pending => GLYPH_PENDING,
        ChangeStatus::MergeFailed => GLYPH_FAILED,
        _ => GLYPH_PASSED,
    };
    let test = match status {
        ChangeStatus::Merged => GLYPH_UNTESTED,
        ChangeStatus::TestPassed | ChangeStatus::InstallPassed | ChangeStatus::InstallFailed => {
            GLYPH_PASSED
        }
        ChangeStatus::TestFailed => GLYPH_FAILED,
        ChangeStatus::Pending | ChangeStatus::MergeFailed => GLYPH_PENDING,
    };
    let install = match status {
        ChangeStatus::InstallPassed => GLYPH_PASSED,
        ChangeStatus::InstallFailed => GLYPH_FAILED,
        _ => GLYPH_PENDING,
    };
    Glyphs {
        merge,
        test,
        install,
    }
}

/// One-line view of the whole batch, e.g. `#1 ✓✓·  ▸#2 ✓?·  #3 ···`
pub fn status_line(changes: &ChangeSet, in_flight: Option<usize>) -> String {
    changes
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let marker = if in_flight == Some(i) {
                IN_FLIGHT_MARKER.to_string()
            } else {
                String::new()
            };
            format!("{marker}{} {}", record.change, glyphs(record.status))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// End-of-run classification of the batch, as change numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Accepted changes
    pub accepted: Vec<u64>,
    /// Changes that didn't merge
    pub merge_failed: Vec<u64>,
    /// Changes that failed validation
    pub test_failed: Vec<u64>,
    /// Accepted changes whose install failed
    pub install_failed: Vec<u64>,
}

impl Summary {
    /// Summarize a finished run
    pub fn from_report(report: &RunReport) -> Self {
        let ids = |changes: Vec<&Change>| -> Vec<u64> { changes.iter().map(|c| c.id).collect() };
        Self {
            accepted: ids(report.changes.accepted()),
            merge_failed: ids(report.changes.merge_failed()),
            test_failed: ids(report.changes.test_failed()),
            install_failed: ids(report.changes.install_failed()),
        }
    }
}

/// Format change numbers as `#1, #2`
pub fn format_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
