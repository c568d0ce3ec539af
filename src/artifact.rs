//! Artifact identity: a workspace-relative path plus content checksum

use serde::{Deserialize, Serialize};

/// A file tracked by the pipeline.
///
/// An empty checksum means the contents have not been hashed yet; checksums
/// are assigned when an artifact is committed to the cache or backfilled
/// from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Workspace-relative path
    pub path: String,
    /// SHA-256 hex digest of the file contents, or empty
    #[serde(default)]
    pub checksum: String,
}

impl Artifact {
    /// Create an artifact with a known checksum
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            checksum: checksum.into(),
        }
    }

    /// Create an artifact whose contents have not been hashed yet
    pub fn uncommitted(path: impl Into<String>) -> Self {
        Self::new(path, "")
    }

    /// Whether a checksum has been assigned
    pub fn has_checksum(&self) -> bool {
        !self.checksum.is_empty()
    }
}
