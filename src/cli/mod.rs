//! Command-line front end

pub mod check;
pub mod logs;
pub mod progress;
pub mod style;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable that overrides the log filter
pub const LOG_ENV: &str = "PRGATE_LOG";

/// Install the stderr log subscriber
///
/// `PRGATE_LOG` takes precedence; otherwise each `-v` raises the level
/// from warnings up to trace.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("prgate={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
