//! Init command - create a dud workspace

use crate::cli::args::InitArgs;
use crate::config::{Config, ConfigManager, DUD_DIR};
use crate::error::{DudError, DudResult};
use crate::index::INDEX_FILE;
use console::style;
use std::env;
use tokio::fs;
use tracing::debug;

/// Execute the init command
pub async fn execute(args: InitArgs) -> DudResult<()> {
    let root = match args.path {
        Some(path) => path,
        None => env::current_dir().map_err(|e| DudError::io("getting current directory", e))?,
    };

    let dud_dir = root.join(DUD_DIR);
    if dud_dir.exists() && !args.force {
        return Err(DudError::WorkspaceExists(root));
    }

    fs::create_dir_all(dud_dir.join("cache"))
        .await
        .map_err(|e| DudError::io("creating workspace directories", e))?;
    debug!("created {}", dud_dir.display());

    let manager = ConfigManager::for_root(&root);
    manager.save(&Config::default()).await?;

    let index_path = root.join(INDEX_FILE);
    if !index_path.exists() {
        fs::write(&index_path, "")
            .await
            .map_err(|e| DudError::io("creating empty index", e))?;
    }

    println!(
        "{} Initialized dud workspace at {}",
        style("✓").green(),
        root.display()
    );
    println!("  Register stages with: dud stage add <file>");
    Ok(())
}
