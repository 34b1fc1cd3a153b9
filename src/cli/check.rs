//! Check command - merge and validate a batch of changes

use crate::cli::logs::{browse_failure_logs, is_interactive};
use crate::cli::progress::CliProgress;
use crate::cli::style::{CROSS, Stylize, WARN, check};
use anstream::println;
use anyhow::{Context, Result};
use prgate::build::{BuildFlags, CommandBuild};
use prgate::cancel::CancelToken;
use prgate::config::{ConfigLayer, load_config};
use prgate::guard::ResourceGuard;
use prgate::integrate::IntegrationEngine;
use prgate::report::{Summary, format_ids};
use prgate::run::{Orchestrator, RunOutcome, RunReport, check_preconditions};
use prgate::types::parse_changes;
use prgate::validate::ValidationRunner;
use prgate::vcs::GitCli;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

/// Options for the check command that are not part of the configuration
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Print the report as JSON instead of the summary
    pub json: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    logs: &'a [PathBuf],
}

/// Run the check command
pub fn run_check(
    path: &Path,
    change_args: &[String],
    overrides: ConfigLayer,
    options: &CheckOptions,
    cancel: &CancelToken,
) -> Result<ExitCode> {
    let git = GitCli::open(path)
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;

    let mut config = load_config(git.root())?;
    config.apply(overrides);
    config.validate()?;

    let changes = parse_changes(change_args, &config.change_ref)?;

    // Before anything is touched
    check_preconditions(&git)?;

    let build = CommandBuild::new(config.build_tool.clone(), git.root());
    let flags = BuildFlags {
        jobs: config.jobs,
        args: config.build_args.clone(),
    };
    let progress = CliProgress::new();
    let engine = IntegrationEngine::new(&git, config.remote.clone(), config.ff_only);
    let runner = ValidationRunner::new(&build, config.targets.clone(), flags, cancel);
    let orchestrator = Orchestrator::new(&git, engine, runner, &progress, cancel);

    let mut guard = ResourceGuard::acquire(&git, &config.scratch_branch)?;
    let outcome = orchestrator.run(&changes, &guard);
    progress.finish();

    let restored = guard.restore_repository();
    let report = settle(outcome, restored)?;

    if !options.json {
        print_summary(&report);
    }

    let keys = report.failure_artifact_keys();
    if !keys.is_empty() {
        if let Some(dir) = &config.log_dir {
            guard.persist_to(dir, keys);
        } else if !options.json && is_interactive() {
            if let Some(store) = guard.artifacts() {
                browse_failure_logs(&keys, store)?;
            }
        }
    }
    guard.cleanup()?;

    if options.json {
        let output = JsonOutput {
            report: &report,
            logs: guard.persisted(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for log in guard.persisted() {
            println!("   Log: {}", log.display().muted());
        }
    }

    if config.fail_exit && report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Combine the run result with the repository restore that followed it
///
/// The run's own error wins; a restore failure behind it is logged.
fn settle<T>(
    outcome: prgate::error::Result<T>,
    restored: prgate::error::Result<()>,
) -> Result<T> {
    match (outcome, restored) {
        (Err(err), Err(restore_err)) => {
            warn!(error = %restore_err, "failed to restore repository");
            Err(err.into())
        }
        (outcome, restored) => {
            let value = outcome?;
            restored?;
            Ok(value)
        }
    }
}

/// Print the end-of-run summary
fn print_summary(report: &RunReport) {
    let summary = Summary::from_report(report);

    println!();
    match report.outcome {
        RunOutcome::CombinedPassed => println!(
            "{} All {} merged change(s) passed together",
            check(),
            summary.accepted.len().accent()
        ),
        RunOutcome::Isolated => println!(
            "{} Combined {} failed; changes were tested one by one",
            WARN.warn(),
            report
                .combined_failure
                .map(|s| s.to_string())
                .unwrap_or_default()
        ),
        RunOutcome::NothingMerged => {
            println!("{} No change could be merged", CROSS.error());
        }
    }

    if !summary.accepted.is_empty() {
        println!("   Accepted: {}", format_ids(&summary.accepted).accent());
    }

    for record in report.changes.records() {
        if let Some(reason) = &record.merge_error {
            println!("   {} {}", "Merge failed:".warn(), record.change.warn());
            let first_line = reason.lines().next().unwrap_or_default();
            if !first_line.is_empty() {
                println!("          {}", first_line.muted());
            }
        }
    }

    for record in report.changes.records() {
        if let Some(stage) = record.failed_stage {
            println!(
                "   {} {} ({stage})",
                "Test failed:".warn(),
                record.change.warn()
            );
        }
    }

    if !summary.install_failed.is_empty() {
        println!(
            "   {} {}",
            "Install failed:".warn(),
            format_ids(&summary.install_failed).muted()
        );
    }
}
