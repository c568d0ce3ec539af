//! Run command - bring stages up to date

use crate::cache::LocalCache;
use crate::cli::args::RunArgs;
use crate::config::{self, ConfigManager};
use crate::error::DudResult;
use crate::index::{Index, RunContext};
use crate::runner::SystemRunner;
use console::style;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs) -> DudResult<()> {
    let root = config::find_root()?;
    let config = ConfigManager::for_root(&root).load().await?;

    let mut index = Index::load(&root)?;
    let targets: Vec<String> = if args.stages.is_empty() {
        index.stage_paths().map(str::to_string).collect()
    } else {
        args.stages
    };

    if targets.is_empty() {
        println!("No stages in the index.");
        return Ok(());
    }

    let cache = LocalCache::new(config.cache_dir(&root))?;
    let run_cache_path = config.run_cache_file(&root);
    debug!("run cache at {}", run_cache_path.display());

    let runner = SystemRunner;
    let ctx = RunContext {
        root: &root,
        recursive: !args.single_stage,
        runner: &runner,
        run_cache_path: &run_cache_path,
    };

    // one traversal state for the whole invocation, so shared upstream
    // stages are visited once
    let mut ran = BTreeMap::new();
    let mut in_progress = BTreeSet::new();
    for stage_path in &targets {
        index.run(stage_path, &cache, &ctx, &mut ran, &mut in_progress)?;
    }

    let executed = ran.values().filter(|executed| **executed).count();
    println!(
        "{} {} stage(s) considered, {} executed",
        style("✓").green(),
        ran.len(),
        executed
    );
    Ok(())
}
