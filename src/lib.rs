//! prgate - check that a batch of pull requests merges and passes the build
//!
//! Changes are squashed one after another onto a scratch branch, validated
//! together, and, only if that fails, validated one by one to find the
//! changes that break the build. The repository is put back the way it was
//! whatever happens.

pub mod artifacts;
pub mod build;
pub mod cancel;
pub mod config;
pub mod error;
pub mod guard;
pub mod integrate;
pub mod progress;
pub mod report;
pub mod run;
pub mod types;
pub mod validate;
pub mod vcs;
