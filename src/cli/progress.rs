//! Live progress line

use crate::cli::style::spinner_style;
use indicatif::ProgressBar;
use prgate::progress::{Phase, ProgressCallback};
use prgate::report::status_line;
use prgate::run::ChangeSet;
use std::time::Duration;

/// Spinner on stderr showing the phase and the glyph line
///
/// indicatif hides it when stderr is not a terminal.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Start the spinner
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// Remove the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_phase(&self, phase: Phase) {
        self.bar.set_prefix(phase.to_string());
    }

    fn on_update(&self, changes: &ChangeSet, in_flight: Option<usize>) {
        self.bar.set_message(status_line(changes, in_flight));
    }

    fn on_message(&self, message: &str) {
        self.bar.println(format!("  {message}"));
    }
}
