//! Run memoization: stage fingerprints mapped to committed output sets
//!
//! A stage key fingerprints everything that determines a stage's outputs:
//! the input contents, the command, and the working directory. The table
//! maps each key to the output checksums of a prior successful run, so an
//! identical run can restore its outputs from the cache instead of
//! executing.

use crate::checksum;
use crate::error::{DudError, DudResult};
use crate::stage::Stage;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Output path -> committed checksum, for one memoized run
pub type OutputSet = BTreeMap<String, String>;

/// Persistent table of memoized runs, serialized as one JSON document
#[derive(Debug)]
pub struct RunCache {
    path: PathBuf,
    table: BTreeMap<String, OutputSet>,
}

impl RunCache {
    /// An empty table that will be written to `path`
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            table: BTreeMap::new(),
        }
    }

    /// Load the table from disk; a missing file yields an empty table
    pub fn load(path: &Path) -> DudResult<Self> {
        if !path.exists() {
            return Ok(Self::empty(path));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| DudError::table_io(path, e.to_string()))?;
        let table = serde_json::from_str(&content)
            .map_err(|e| DudError::table_io(path, e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Persist the table with a whole-file atomic rewrite.
    ///
    /// The document is written to a temporary sibling and renamed over the
    /// table, so the file on disk is always either the old or the new
    /// state.
    pub fn save(&self) -> DudResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DudError::table_io(&self.path, e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.table)
            .map_err(|e| DudError::table_io(&self.path, e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| DudError::table_io(&tmp, e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| DudError::table_io(&self.path, e.to_string()))
    }

    /// The memoized output set for a stage key
    pub fn get(&self, key: &str) -> Option<&OutputSet> {
        self.table.get(key)
    }

    /// Record the output set of a successful run
    pub fn insert(&mut self, key: String, outputs: OutputSet) {
        self.table.insert(key, outputs);
    }

    /// Number of memoized runs
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Fingerprint a stage over its input contents, command, and working dir.
///
/// Input checksums are digested in sorted order, so in-memory iteration
/// order never affects the key. Each input is rehashed from the file on
/// disk (and the checksum filled in place), so the key always reflects the
/// contents a run would actually see, never a stale recorded checksum. An
/// absent input falls back to its recorded checksum, or to its path when
/// it has none, so two stages missing different inputs key apart. Input
/// paths are otherwise not part of the key: stages with identical
/// content-addressed inputs and the same command and working dir share one
/// memoization entry.
pub fn stage_key(stage: &mut Stage, root: &Path) -> DudResult<String> {
    let mut sums = Vec::with_capacity(stage.inputs.len());
    for artifact in stage.inputs.values_mut() {
        match File::open(root.join(&artifact.path)) {
            Ok(file) => {
                artifact.checksum = checksum::checksum(file)?;
                sums.push(artifact.checksum.clone());
            }
            Err(_) if artifact.has_checksum() => sums.push(artifact.checksum.clone()),
            Err(_) => sums.push(artifact.path.clone()),
        }
    }

    let inputs_digest = checksum::checksum_of_sorted(sums);
    let mut hasher = Sha256::new();
    hasher.update(inputs_digest.as_bytes());
    hasher.update(stage.command.as_bytes());
    hasher.update(stage.working_dir.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
