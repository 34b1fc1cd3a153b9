//! prgate binary

mod cli;

use anstream::eprintln;
use clap::Parser;
use cli::check::{CheckOptions, run_check};
use cli::style::Stylize;
use prgate::cancel::CancelToken;
use prgate::config::{ConfigLayer, TargetsLayer};
use prgate::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// Exit status after an interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// Check that a batch of pull requests merges and passes the build
///
/// Every change is squashed onto a scratch branch and the result is built
/// and tested once. If that fails, the changes are merged and tested one at
/// a time to find the ones that break the build. Your checkout is restored
/// when the run ends, including on Ctrl-C.
#[derive(Parser, Debug)]
#[command(name = "prgate")]
#[command(version, about)]
struct Cli {
    /// Changes to check: `123`, `#123`, or a pull/merge request URL
    #[arg(value_name = "CHANGES")]
    changes: Vec<String>,

    /// Remote to fetch changes from
    #[arg(short, long)]
    remote: Option<String>,

    /// Refspec template for a change; `{id}` is replaced by its number
    #[arg(long, value_name = "TEMPLATE")]
    change_ref: Option<String>,

    /// Parallel jobs for the build tool
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Extra argument for every build invocation (repeatable)
    #[arg(short = 'a', long = "build-arg", value_name = "ARG", allow_hyphen_values = true)]
    build_args: Vec<String>,

    /// Build tool to run
    #[arg(long, value_name = "TOOL")]
    build_tool: Option<String>,

    /// Target for the clean stage
    #[arg(long, value_name = "TARGET")]
    clean_target: Option<String>,

    /// Target for the build stage (skipped when unset)
    #[arg(long, value_name = "TARGET")]
    build_target: Option<String>,

    /// Target for the test stage
    #[arg(long, value_name = "TARGET")]
    test_target: Option<String>,

    /// Target for the install stage (skipped when unset)
    #[arg(long, value_name = "TARGET")]
    install_target: Option<String>,

    /// Exit with status 1 when any change fails to merge or pass
    #[arg(short, long)]
    fail_exit: bool,

    /// Keep failure logs in this directory instead of prompting
    #[arg(short, long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Refuse merges that are not fast-forwards
    #[arg(long)]
    ff_only: bool,

    /// Name of the scratch branch
    #[arg(long, value_name = "BRANCH")]
    scratch_branch: Option<String>,

    /// Path to the repository
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Settings given on the command line, as the topmost config layer
    fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            remote: self.remote.clone(),
            change_ref: self.change_ref.clone(),
            jobs: self.jobs,
            build_tool: self.build_tool.clone(),
            build_args: (!self.build_args.is_empty()).then(|| self.build_args.clone()),
            targets: TargetsLayer {
                clean: self.clean_target.clone(),
                build: self.build_target.clone(),
                test: self.test_target.clone(),
                install: self.install_target.clone(),
            },
            fail_exit: self.fail_exit.then_some(true),
            log_dir: self.log_dir.clone(),
            ff_only: self.ff_only.then_some(true),
            scratch_branch: self.scratch_branch.clone(),
        }
    }
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix
fn listen_for_signals(token: CancelToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
                debug!("SIGTERM handler unavailable");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl-C");
                    token.cancel();
                }
                return;
            };
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if result.is_err() {
                        return;
                    }
                    info!("received Ctrl-C");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM");
                }
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            info!("received Ctrl-C");
        }
        token.cancel();
    });
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::Interrupted))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    cli::init_logging(args.verbose);

    let cancel = CancelToken::new();
    listen_for_signals(cancel.clone());

    let overrides = args.config_layer();
    let options = CheckOptions { json: args.json };
    let worker_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        run_check(&args.path, &args.changes, overrides, &options, &worker_cancel)
    })
    .await;

    match result {
        Ok(Ok(code)) => code,
        Ok(Err(err)) if is_interrupted(&err) || cancel.is_cancelled() => {
            eprintln!("{} interrupted; repository restored", "error:".error());
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Ok(Err(err)) => {
            eprintln!("{} {err:#}", "error:".error());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{} run aborted: {err}", "error:".error());
            ExitCode::FAILURE
        }
    }
}
