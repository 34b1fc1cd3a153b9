//! Interactive access to failure logs before they are cleaned up

use crate::cli::style::Stylize;
use anstream::println;
use anyhow::Result;
use dialoguer::Select;
use prgate::artifacts::{ArtifactStore, COMBINED_KEY};
use prgate::error::Error;
use std::io::{ErrorKind, IsTerminal};

/// Whether we can prompt the user
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn label(key: &str) -> String {
    if key == COMBINED_KEY {
        "combined run".to_string()
    } else {
        format!("#{key}")
    }
}

/// Ctrl-C at the prompt arrives as an interrupted read, not as a signal
fn selection_error(err: dialoguer::Error) -> anyhow::Error {
    match err {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => {
            Error::Interrupted.into()
        }
        other => anyhow::Error::new(other).context("failed to read selection"),
    }
}

/// Let the user print failure logs until they choose to continue
pub fn browse_failure_logs(keys: &[String], store: &ArtifactStore) -> Result<()> {
    let mut items: Vec<String> = keys.iter().map(|k| label(k)).collect();
    items.push("Done (logs are deleted)".to_string());

    loop {
        let choice = Select::new()
            .with_prompt("Show a failure log")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(selection_error)?;

        let Some(index) = choice.filter(|&i| i < keys.len()) else {
            return Ok(());
        };

        let key = &keys[index];
        match store.read(key)? {
            Some(log) => {
                println!("{}", format!("----- {} -----", label(key)).emphasis());
                println!("{log}");
                println!("{}", format!("----- end of {} -----", label(key)).emphasis());
            }
            None => println!("{}", "No output was recorded.".muted()),
        }
    }
}
