//! Ephemeral storage for validation output
//!
//! Each validation attempt writes the combined output of its pipeline
//! stages to `<key>.log` in a temporary directory owned by the resource
//! guard. The directory disappears with the guard unless the failing logs
//! are copied somewhere persistent first.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Artifact key of the combined (all changes) validation run
pub const COMBINED_KEY: &str = "combined";

const LOG_EXTENSION: &str = "log";

/// Temporary directory of per-key log files
#[derive(Debug)]
pub struct ArtifactStore {
    dir: TempDir,
}

impl ArtifactStore {
    /// Create a fresh, empty store
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("prgate-").tempdir()?;
        Ok(Self { dir })
    }

    /// Directory holding the logs
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the log for `key` (may not exist yet)
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.path().join(format!("{key}.{LOG_EXTENSION}"))
    }

    /// Start a new attempt for `key`, discarding earlier content
    pub fn begin(&self, key: &str) -> Result<()> {
        fs::write(self.path(key), "")?;
        Ok(())
    }

    /// Append one stage's output under a header line
    pub fn append(&self, key: &str, header: &str, output: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(key))?;
        writeln!(file, "==> {header}")?;
        file.write_all(output.as_bytes())?;
        if !output.is_empty() && !output.ends_with('\n') {
            writeln!(file)?;
        }
        Ok(())
    }

    /// Replace the log for `to` with a copy of the log for `from`
    pub fn copy(&self, from: &str, to: &str) -> Result<()> {
        fs::copy(self.path(from), self.path(to))?;
        Ok(())
    }

    /// Read the log for `key`; `None` if nothing was recorded
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Whether a non-empty log exists for `key`
    pub fn has_content(&self, key: &str) -> bool {
        fs::metadata(self.path(key)).is_ok_and(|m| m.len() > 0)
    }

    /// Copy the logs for `keys` into `dest`, creating it if needed
    ///
    /// Keys without a log are skipped. Returns the written paths.
    pub fn persist(&self, keys: &[String], dest: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dest)?;
        let mut written = Vec::new();
        for key in keys {
            let src = self.path(key);
            if !src.exists() {
                continue;
            }
            let target = dest.join(format!("{key}.{LOG_EXTENSION}"));
            fs::copy(&src, &target)?;
            written.push(target);
        }
        Ok(written)
    }

    /// Delete the directory now instead of on drop
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
