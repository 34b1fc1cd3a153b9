//! Configuration
//!
//! Settings are layered: built-in defaults, then the user config file
//! (`<config dir>/prgate/config.toml`), then `.prgate.toml` at the
//! repository root, then command-line flags. Every layer is a
//! [`ConfigLayer`] where unset fields leave the value below untouched.

use crate::error::{Error, Result};
use crate::types::CHANGE_ID_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the user config dir
const CONFIG_DIR: &str = "prgate";

/// User config filename
const CONFIG_FILE: &str = "config.toml";

/// Repository config filename
pub const REPO_CONFIG_FILE: &str = ".prgate.toml";

/// Build targets for each pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    /// Clean target
    pub clean: String,
    /// Build target; the stage is skipped when unset
    pub build: Option<String>,
    /// Test target
    pub test: String,
    /// Install target; the stage is skipped when unset
    pub install: Option<String>,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            clean: "clean".to_string(),
            build: None,
            test: "check".to_string(),
            install: None,
        }
    }
}

/// Fully resolved settings for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Remote to fetch changes from
    pub remote: String,
    /// Refspec template for fetching a change; `{id}` is the change number
    pub change_ref: String,
    /// Parallelism hint for the build tool
    pub jobs: Option<usize>,
    /// Build tool executable
    pub build_tool: String,
    /// Extra arguments for every build invocation
    pub build_args: Vec<String>,
    /// Stage targets
    pub targets: Targets,
    /// Exit with status 1 when any change fails
    pub fail_exit: bool,
    /// Directory to keep failure logs in instead of prompting
    pub log_dir: Option<PathBuf>,
    /// Refuse merges that are not fast-forwards
    pub ff_only: bool,
    /// Name of the scratch integration branch
    pub scratch_branch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            change_ref: "pull/{id}/head".to_string(),
            jobs: None,
            build_tool: "make".to_string(),
            build_args: Vec::new(),
            targets: Targets::default(),
            fail_exit: false,
            log_dir: None,
            ff_only: false,
            scratch_branch: "prgate/integration".to_string(),
        }
    }
}

/// Stage targets in a config layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsLayer {
    /// Clean target
    pub clean: Option<String>,
    /// Build target
    pub build: Option<String>,
    /// Test target
    pub test: Option<String>,
    /// Install target
    pub install: Option<String>,
}

/// One layer of settings: a config file or the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// Remote name
    pub remote: Option<String>,
    /// Refspec template
    pub change_ref: Option<String>,
    /// Parallelism hint
    pub jobs: Option<usize>,
    /// Build tool
    pub build_tool: Option<String>,
    /// Build arguments; replaces, not extends, lower layers
    pub build_args: Option<Vec<String>>,
    /// Stage targets
    #[serde(default)]
    pub targets: TargetsLayer,
    /// Fail exit
    pub fail_exit: Option<bool>,
    /// Failure log directory
    pub log_dir: Option<PathBuf>,
    /// Fast-forward only
    pub ff_only: Option<bool>,
    /// Scratch branch name
    pub scratch_branch: Option<String>,
}

impl Config {
    /// Apply a layer on top of these settings
    pub fn apply(&mut self, layer: ConfigLayer) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        set(&mut self.remote, layer.remote);
        set(&mut self.change_ref, layer.change_ref);
        if layer.jobs.is_some() {
            self.jobs = layer.jobs;
        }
        set(&mut self.build_tool, layer.build_tool);
        set(&mut self.build_args, layer.build_args);
        set(&mut self.targets.clean, layer.targets.clean);
        if layer.targets.build.is_some() {
            self.targets.build = layer.targets.build;
        }
        set(&mut self.targets.test, layer.targets.test);
        if layer.targets.install.is_some() {
            self.targets.install = layer.targets.install;
        }
        set(&mut self.fail_exit, layer.fail_exit);
        if layer.log_dir.is_some() {
            self.log_dir = layer.log_dir;
        }
        set(&mut self.ff_only, layer.ff_only);
        set(&mut self.scratch_branch, layer.scratch_branch);
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(Error::Config("remote must not be empty".to_string()));
        }
        if !self.change_ref.contains(CHANGE_ID_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "change_ref '{}' must contain {CHANGE_ID_PLACEHOLDER}",
                self.change_ref
            )));
        }
        if self.jobs == Some(0) {
            return Err(Error::Config("jobs must be at least 1".to_string()));
        }
        if self.build_tool.trim().is_empty() {
            return Err(Error::Config("build_tool must not be empty".to_string()));
        }
        if self.targets.clean.trim().is_empty() || self.targets.test.trim().is_empty() {
            return Err(Error::Config(
                "clean and test targets must not be empty".to_string(),
            ));
        }
        if self.scratch_branch.trim().is_empty() {
            return Err(Error::Config(
                "scratch_branch must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the user config file, if the platform has a config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Path of the repository config file
pub fn repo_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(REPO_CONFIG_FILE)
}

/// Load one config file
///
/// Returns `None` if the file doesn't exist.
pub fn load_layer(path: &Path) -> Result<Option<ConfigLayer>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let layer: ConfigLayer = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    debug!(path = %path.display(), "loaded config layer");
    Ok(Some(layer))
}

/// Resolve settings from defaults and config files
///
/// Command-line flags are applied by the caller on top of the result.
pub fn load_config(repo_root: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = user_config_path() {
        if let Some(layer) = load_layer(&path)? {
            config.apply(layer);
        }
    }
    if let Some(layer) = load_layer(&repo_config_path(repo_root))? {
        config.apply(layer);
    }

    Ok(config)
}
