//! Content-addressed artifact cache
//!
//! Objects are stored under a two-character fan-out of their SHA-256
//! checksum and materialized into the workspace by hardlink where possible.
//! The cache never deletes objects; committing the same contents twice is a
//! no-op.

pub mod local;

pub use local::LocalCache;

use crate::artifact::Artifact;
use crate::error::DudResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How an object is materialized in (or ingested from) the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStrategy {
    /// Hardlink to the cache object, falling back to a byte copy when the
    /// link fails (e.g. across devices)
    Link,
    /// Always copy bytes
    Copy,
}

/// Result of probing an artifact against the workspace and cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactStatus {
    /// The file exists at the artifact's workspace path
    pub workspace_present: bool,
    /// The artifact's object exists in the local cache
    pub in_cache: bool,
    /// The workspace file's contents match the artifact's checksum
    pub contents_match: bool,
}

/// Abstract artifact store consumed by the run engine.
///
/// `root` is always the workspace root; artifact paths are resolved
/// against it.
pub trait ArtifactCache {
    /// Probe whether the workspace file matches the artifact's checksum.
    ///
    /// Fails when the file exists but cannot be read. With `check_contents`
    /// unset, a size comparison against the cache object stands in for
    /// hashing.
    fn status(&self, root: &Path, artifact: &Artifact, check_contents: bool)
        -> DudResult<ArtifactStatus>;

    /// Ingest the workspace file into the cache and assign its checksum.
    ///
    /// With `Link`, the workspace file becomes a hardlink to the stored
    /// object; with `Copy`, the original file is left untouched.
    fn commit(
        &self,
        root: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> DudResult<()>;

    /// Materialize the object named by the artifact's checksum at its
    /// workspace path, overwriting any existing file. A missing object is
    /// an error.
    fn checkout(&self, root: &Path, artifact: &Artifact, strategy: CheckoutStrategy)
        -> DudResult<()>;

    /// Copy the objects named by the artifacts' checksums from a remote
    /// object store into the local cache
    fn fetch(&self, remote: &Path, artifacts: &[&Artifact]) -> DudResult<()>;

    /// Cache-relative object path for a checksum; pure and deterministic
    fn path_for_checksum(&self, checksum: &str) -> DudResult<PathBuf>;
}

/// Hardlink `src` to `dest`, falling back to a byte copy.
///
/// Returns true when the hardlink succeeded.
pub fn link_or_copy(src: &Path, dest: &Path) -> io::Result<bool> {
    match fs::hard_link(src, dest) {
        Ok(()) => Ok(true),
        Err(_) => {
            fs::copy(src, dest)?;
            Ok(false)
        }
    }
}
