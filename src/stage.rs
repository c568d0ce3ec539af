//! Stage model: a declared command with its input and output artifacts
//!
//! Stages are stored as TOML files in the workspace. After a successful run
//! the engine rewrites the file with the committed artifact checksums and
//! the stage's own definition checksum, so later runs can tell a user edit
//! from an unchanged definition.

use crate::artifact::Artifact;
use crate::error::{DudError, DudResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

/// A unit of work in the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    /// Input artifacts, keyed by workspace-relative path
    pub inputs: BTreeMap<String, Artifact>,
    /// Output artifacts, keyed by workspace-relative path
    pub outputs: BTreeMap<String, Artifact>,
    /// Shell command to execute; empty for stages that only anchor
    /// externally produced files
    pub command: String,
    /// Working directory for the command, relative to the workspace root
    pub working_dir: String,
    /// Definition checksum recorded at the last successful run; empty if
    /// the stage has never run
    pub checksum: String,
}

/// On-disk TOML representation of a stage.
///
/// Artifacts are stored as `path = "checksum"` entries; scalar fields come
/// first so the document serializes as valid TOML.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StageFile {
    #[serde(default)]
    command: String,
    #[serde(default, rename = "working-dir")]
    working_dir: String,
    #[serde(default)]
    checksum: String,
    #[serde(default)]
    inputs: BTreeMap<String, String>,
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

impl Stage {
    /// Load and validate a stage from a TOML file
    pub fn from_file(path: &Path) -> DudResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| DudError::StageInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file: StageFile = toml::from_str(&content).map_err(|e| DudError::StageInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let stage = Self {
            inputs: to_artifacts(file.inputs),
            outputs: to_artifacts(file.outputs),
            command: file.command,
            working_dir: file.working_dir,
            checksum: file.checksum,
        };
        stage.validate(path)?;
        Ok(stage)
    }

    /// Write the stage back to disk
    pub fn save(&self, path: &Path) -> DudResult<()> {
        let file = StageFile {
            command: self.command.clone(),
            working_dir: self.working_dir.clone(),
            checksum: self.checksum.clone(),
            inputs: to_checksums(&self.inputs),
            outputs: to_checksums(&self.outputs),
        };
        let content = toml::to_string_pretty(&file)?;
        fs::write(path, content)
            .map_err(|e| DudError::io(format!("writing stage file {}", path.display()), e))
    }

    fn validate(&self, path: &Path) -> DudResult<()> {
        for art_path in self.inputs.keys().chain(self.outputs.keys()) {
            if art_path.is_empty() {
                return Err(DudError::StageInvalid {
                    path: path.to_path_buf(),
                    reason: "empty artifact path".to_string(),
                });
            }
        }
        for art_path in self.inputs.keys() {
            if self.outputs.contains_key(art_path) {
                return Err(DudError::StageInvalid {
                    path: path.to_path_buf(),
                    reason: format!("{art_path} is declared as both input and output"),
                });
            }
        }
        Ok(())
    }

    /// Whether this stage has a command to execute
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }

    /// Hash of the stage *definition*: command, working dir, and the sorted
    /// input and output paths.
    ///
    /// Artifact content checksums are deliberately excluded; the value only
    /// changes when the user edits the stage.
    pub fn definition_checksum(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(b"command:");
        hasher.update(self.command.as_bytes());
        hasher.update(b"\n");

        hasher.update(b"working-dir:");
        hasher.update(self.working_dir.as_bytes());
        hasher.update(b"\n");

        // BTreeMap iteration is already path-sorted
        for path in self.inputs.keys() {
            hasher.update(b"input:");
            hasher.update(path.as_bytes());
            hasher.update(b"\n");
        }
        for path in self.outputs.keys() {
            hasher.update(b"output:");
            hasher.update(path.as_bytes());
            hasher.update(b"\n");
        }

        hex::encode(hasher.finalize())
    }

    /// Build the OS command for this stage.
    ///
    /// The command runs under `sh -c` with the working directory resolved
    /// against the workspace root; stdio is inherited from the caller.
    pub fn create_command(&self, root: &Path) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(&self.command);
        command.current_dir(root.join(&self.working_dir));
        command
    }
}

fn to_artifacts(entries: BTreeMap<String, String>) -> BTreeMap<String, Artifact> {
    entries
        .into_iter()
        .map(|(path, checksum)| {
            let art = Artifact::new(path.clone(), checksum);
            (path, art)
        })
        .collect()
}

fn to_checksums(artifacts: &BTreeMap<String, Artifact>) -> BTreeMap<String, String> {
    artifacts
        .iter()
        .map(|(path, art)| (path.clone(), art.checksum.clone()))
        .collect()
}
