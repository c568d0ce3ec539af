//! Workspace configuration management

pub mod schema;

pub use schema::Config;

use crate::error::{DudError, DudResult};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Metadata directory that marks a workspace root
pub const DUD_DIR: &str = ".dud";

/// Configuration file location, relative to the workspace root
pub const CONFIG_FILE: &str = ".dud/config.toml";

/// Loads and saves a workspace's configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for a workspace root
    pub fn for_root(root: &Path) -> Self {
        Self {
            config_path: root.join(CONFIG_FILE),
        }
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> DudResult<Config> {
        if !self.config_path.exists() {
            debug!("config file not found, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            DudError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| DudError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DudResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DudError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            DudError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Find the workspace root by walking up from the current directory until a
/// `.dud` directory appears
pub fn find_root() -> DudResult<PathBuf> {
    let cwd = env::current_dir().map_err(|e| DudError::io("getting current directory", e))?;
    find_root_from(&cwd).ok_or(DudError::NotAWorkspace(cwd))
}

/// Find the workspace root at or above `start`
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(DUD_DIR).is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}
