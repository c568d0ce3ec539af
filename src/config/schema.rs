//! Configuration schema for a dud workspace
//!
//! Configuration is stored at `<root>/.dud/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Artifact cache directory; relative paths resolve against the
    /// workspace root
    pub cache: String,

    /// Remote object store (a directory, e.g. a mounted share) to fetch
    /// missing cache objects from
    pub remote: Option<String>,

    /// Run cache directory; defaults to `.dud/io-cache`. Supports `~/`
    /// expansion so workspaces can share one table.
    pub run_cache: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: ".dud/cache".to_string(),
            remote: None,
            run_cache: None,
        }
    }
}

impl Config {
    /// Absolute artifact cache directory
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.cache)
    }

    /// Absolute path of the run memoization table
    pub fn run_cache_file(&self, root: &Path) -> PathBuf {
        let dir = match &self.run_cache {
            Some(dir) => resolve(root, dir),
            None => root.join(".dud").join("io-cache"),
        };
        dir.join("io-hash-table")
    }

    /// Absolute remote object store directory, if configured
    pub fn remote_dir(&self, root: &Path) -> Option<PathBuf> {
        self.remote.as_ref().map(|remote| resolve(root, remote))
    }
}

/// Resolve a configured path: `~/` expands to the home directory, absolute
/// paths stand alone, and anything else is workspace-relative
fn resolve(root: &Path, value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
