//! Import-artifacts command - materialize a stage's committed outputs
//!
//! Unlike `run`, this works from a stage file alone, whether or not it is
//! in the index: each output's object is located in the local cache,
//! fetched from the remote when configured, and hardlinked (or copied) to
//! its destination. Problems with one output never abort the others.

use crate::cache::{link_or_copy, ArtifactCache, LocalCache};
use crate::cli::args::ImportArgs;
use crate::config::{self, ConfigManager};
use crate::error::DudResult;
use crate::stage::Stage;
use console::style;
use std::fs;
use std::path::Path;
use tracing::info;

/// Execute the import-artifacts command
pub async fn execute(args: ImportArgs) -> DudResult<()> {
    let root = config::find_root()?;
    let config = ConfigManager::for_root(&root).load().await?;

    let stage = Stage::from_file(&args.stage_file)?;
    let cache = LocalCache::new(config.cache_dir(&root))?;
    let remote = config.remote_dir(&root);

    let mut imported = 0usize;
    for (path, artifact) in &stage.outputs {
        if !artifact.has_checksum() {
            skip(path, "no committed checksum");
            continue;
        }

        let object = match cache.object_path(&artifact.checksum) {
            Ok(object) => object,
            Err(e) => {
                skip(path, &e.to_string());
                continue;
            }
        };

        if !object.is_file() {
            if let Some(remote) = &remote {
                info!("{path} not in local cache, fetching from remote");
                if let Err(e) = cache.fetch(remote, &[artifact]) {
                    skip(path, &format!("fetch failed: {e}"));
                    continue;
                }
            }
        }
        if !object.is_file() {
            skip(path, "not found in cache or remote");
            continue;
        }

        let dest = match &args.output_dir {
            Some(dir) => dir.join(Path::new(path).file_name().unwrap_or_default()),
            None => root.join(path),
        };
        if let Some(parent) = dest.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                skip(path, &format!("creating {}: {e}", parent.display()));
                continue;
            }
        }

        match link_or_copy(&object, &dest) {
            Ok(linked) => {
                let how = if linked { "linked" } else { "copied" };
                println!(
                    "{} Imported ({how}) {path} to {}",
                    style("✓").green(),
                    dest.display()
                );
                imported += 1;
            }
            Err(e) => skip(path, &e.to_string()),
        }
    }

    println!("Imported {imported} of {} output(s)", stage.outputs.len());
    Ok(())
}

fn skip(path: &str, reason: &str) {
    eprintln!(
        "{} Skipping output {path}: {reason}",
        style("!").yellow()
    );
}
