//! The run engine: recursive staleness evaluation and stage execution
//!
//! For each requested stage the engine collects staleness signals, recurses
//! through upstream stages, and then either does nothing, restores outputs
//! from a memoized prior run, or executes the stage command and commits its
//! outputs to the cache.

use crate::cache::{ArtifactCache, CheckoutStrategy};
use crate::checksum;
use crate::error::{DudError, DudResult};
use crate::index::run_cache::{self, OutputSet, RunCache};
use crate::index::Index;
use crate::runner::CommandRunner;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-invocation run configuration.
///
/// Built once by the caller and shared across the whole recursive
/// traversal; the engine never reads process-wide state.
pub struct RunContext<'a> {
    /// Workspace root
    pub root: &'a Path,
    /// Recurse into upstream stages
    pub recursive: bool,
    /// Executes stage commands
    pub runner: &'a dyn CommandRunner,
    /// Location of the run memoization table
    pub run_cache_path: &'a Path,
}

impl Index {
    /// Run a stage and, recursively, every upstream stage it depends on.
    ///
    /// `ran` records stages completed in this invocation (value: whether a
    /// command actually executed); `in_progress` holds the recursion stack
    /// for cycle detection. Both start empty at the top-level call and must
    /// not be shared across invocations.
    pub fn run(
        &mut self,
        stage_path: &str,
        cache: &dyn ArtifactCache,
        ctx: &RunContext<'_>,
        ran: &mut BTreeMap<String, bool>,
        in_progress: &mut BTreeSet<String>,
    ) -> DudResult<()> {
        if ran.contains_key(stage_path) {
            return Ok(());
        }
        if in_progress.contains(stage_path) {
            return Err(DudError::CycleDetected {
                stage: stage_path.to_string(),
            });
        }
        in_progress.insert(stage_path.to_string());

        // Work on a copy; the updated stage is written back on completion.
        let mut stage = self
            .get(stage_path)
            .cloned()
            .ok_or_else(|| DudError::UnknownStage(stage_path.to_string()))?;

        let checksum_up_to_date =
            !stage.checksum.is_empty() && stage.definition_checksum() == stage.checksum;

        let mut do_run = false;
        let mut reason = "";

        // A command with no inputs can never be proven up to date.
        if stage.has_command() && stage.inputs.is_empty() {
            do_run = true;
            reason = "has command and no inputs";
        }

        if !checksum_up_to_date {
            do_run = true;
            reason = "definition modified";
        }

        // Inspect every input; upstream stages are visited even when a run
        // is already decided, so the whole graph settles in one pass.
        let input_paths: Vec<String> = stage.inputs.keys().cloned().collect();
        for path in &input_paths {
            match self.find_owner(path).map(str::to_string) {
                None => {
                    let status = cache.status(ctx.root, &stage.inputs[path], true)?;
                    if !status.contents_match {
                        do_run = true;
                        reason = "input out-of-date";
                    }
                }
                Some(owner) if ctx.recursive => {
                    self.run(&owner, cache, ctx, ran, in_progress)?;
                    if ran.get(&owner).copied().unwrap_or(false) {
                        do_run = true;
                        reason = "upstream stage out-of-date";
                    }
                }
                Some(_) => {}
            }
        }

        if !do_run {
            for artifact in stage.outputs.values() {
                let status = cache.status(ctx.root, artifact, true)?;
                if !status.contents_match {
                    do_run = true;
                    reason = "output out-of-date";
                    break;
                }
            }
        }

        let mut did_execute = false;
        if do_run {
            let key = run_cache::stage_key(&mut stage, ctx.root)?;
            let mut table = match RunCache::load(ctx.run_cache_path) {
                Ok(table) => table,
                Err(e) => {
                    warn!("failed to load run cache: {e}");
                    RunCache::empty(ctx.run_cache_path)
                }
            };

            // A memoized identical run satisfies a stale stage: restore its
            // outputs instead of executing.
            if let Some(outputs) = table.get(&key) {
                if stage.outputs.keys().all(|path| outputs.contains_key(path)) {
                    info!("restoring outputs for stage {stage_path} from the run cache");
                    let outputs = outputs.clone();
                    let mut restored = true;
                    for (path, artifact) in stage.outputs.iter_mut() {
                        artifact.checksum = outputs[path].clone();
                        if let Err(e) = cache.checkout(ctx.root, artifact, CheckoutStrategy::Link)
                        {
                            warn!("failed to check out {path} from cache: {e}");
                            restored = false;
                            break;
                        }
                    }
                    if restored {
                        self.stages.insert(stage_path.to_string(), stage);
                        ran.insert(stage_path.to_string(), false);
                        in_progress.remove(stage_path);
                        return Ok(());
                    }
                    // fall through to execution
                } else {
                    debug!(
                        "run cache entry for stage {stage_path} does not cover all declared outputs"
                    );
                }
            }

            if stage.has_command() {
                info!("running stage {stage_path} ({reason})");
                let mut command = stage.create_command(ctx.root);
                debug!(
                    "(in {}) {}",
                    ctx.root.join(&stage.working_dir).display(),
                    stage.command
                );
                let status =
                    ctx.runner
                        .run(&mut command)
                        .map_err(|e| DudError::CommandFailed {
                            stage: stage_path.to_string(),
                            command: stage.command.clone(),
                            reason: e.to_string(),
                        })?;
                if !status.success() {
                    return Err(DudError::CommandFailed {
                        stage: stage_path.to_string(),
                        command: stage.command.clone(),
                        reason: format!("exited with {status}"),
                    });
                }
                did_execute = true;

                for artifact in stage.outputs.values_mut() {
                    cache.commit(ctx.root, artifact, CheckoutStrategy::Link)?;
                }

                for artifact in stage.inputs.values_mut() {
                    if !artifact.has_checksum() {
                        if let Ok(file) = File::open(ctx.root.join(&artifact.path)) {
                            if let Ok(sum) = checksum::checksum(file) {
                                artifact.checksum = sum;
                            }
                        }
                    }
                }

                // Persist the committed checksums and the new definition
                // checksum, so the next run sees this definition as clean.
                stage.checksum = stage.definition_checksum();
                stage.save(&ctx.root.join(stage_path))?;

                let outputs: OutputSet = stage
                    .outputs
                    .iter()
                    .map(|(path, artifact)| (path.clone(), artifact.checksum.clone()))
                    .collect();
                table.insert(key, outputs);
                match table.save() {
                    Ok(()) => debug!("recorded run cache entry for stage {stage_path}"),
                    // the run itself succeeded; the next run just misses
                    Err(e) => warn!("failed to update run cache: {e}"),
                }
            } else {
                info!("nothing to do for stage {stage_path} ({reason}, but no command)");
            }
        } else {
            info!("nothing to do for stage {stage_path} (up-to-date)");
        }

        self.stages.insert(stage_path.to_string(), stage);
        ran.insert(stage_path.to_string(), did_execute);
        in_progress.remove(stage_path);
        Ok(())
    }
}
