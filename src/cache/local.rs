//! Local on-disk artifact cache

use crate::artifact::Artifact;
use crate::cache::{link_or_copy, ArtifactCache, ArtifactStatus, CheckoutStrategy};
use crate::checksum;
use crate::error::{DudError, DudResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content-addressed object store rooted at a single directory
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Open (creating if needed) a cache at `dir`
    pub fn new(dir: PathBuf) -> DudResult<Self> {
        fs::create_dir_all(&dir).map_err(|e| DudError::cache_io("open", dir.clone(), e))?;
        Ok(Self { dir })
    }

    /// The cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of the object for a checksum
    pub fn object_path(&self, checksum: &str) -> DudResult<PathBuf> {
        Ok(self.dir.join(self.path_for_checksum(checksum)?))
    }
}

impl ArtifactCache for LocalCache {
    fn status(
        &self,
        root: &Path,
        artifact: &Artifact,
        check_contents: bool,
    ) -> DudResult<ArtifactStatus> {
        let workspace = root.join(&artifact.path);
        let workspace_present = workspace.is_file();

        let object = if artifact.has_checksum() {
            Some(self.object_path(&artifact.checksum)?)
        } else {
            None
        };
        let in_cache = object.as_deref().is_some_and(Path::is_file);

        if !artifact.has_checksum() || !workspace_present {
            return Ok(ArtifactStatus {
                workspace_present,
                in_cache,
                contents_match: false,
            });
        }

        let contents_match = if check_contents {
            checksum::checksum_file(&workspace)? == artifact.checksum
        } else {
            // cheap probe: equal size to the stored object
            match object.as_deref() {
                Some(object) if in_cache => file_len(&workspace)? == file_len(object)?,
                _ => false,
            }
        };

        Ok(ArtifactStatus {
            workspace_present,
            in_cache,
            contents_match,
        })
    }

    fn commit(
        &self,
        root: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> DudResult<()> {
        let workspace = root.join(&artifact.path);
        let sum = checksum::checksum_file(&workspace)?;
        let object = self.object_path(&sum)?;
        if let Some(parent) = object.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DudError::cache_io("commit", parent.to_path_buf(), e))?;
        }

        match strategy {
            CheckoutStrategy::Link => {
                if object.is_file() {
                    debug!("object {sum} already cached, relinking {}", artifact.path);
                    fs::remove_file(&workspace)
                        .map_err(|e| DudError::cache_io("commit", workspace.clone(), e))?;
                } else if fs::rename(&workspace, &object).is_err() {
                    // cache on another device: copy in, then drop the original
                    fs::copy(&workspace, &object)
                        .map_err(|e| DudError::cache_io("commit", object.clone(), e))?;
                    fs::remove_file(&workspace)
                        .map_err(|e| DudError::cache_io("commit", workspace.clone(), e))?;
                }
                link_or_copy(&object, &workspace)
                    .map_err(|e| DudError::cache_io("commit", workspace.clone(), e))?;
            }
            CheckoutStrategy::Copy => {
                if !object.is_file() {
                    fs::copy(&workspace, &object)
                        .map_err(|e| DudError::cache_io("commit", object.clone(), e))?;
                }
            }
        }

        artifact.checksum = sum;
        Ok(())
    }

    fn checkout(
        &self,
        root: &Path,
        artifact: &Artifact,
        strategy: CheckoutStrategy,
    ) -> DudResult<()> {
        if !artifact.has_checksum() {
            return Err(DudError::MissingChecksum {
                path: artifact.path.clone(),
            });
        }
        let object = self.object_path(&artifact.checksum)?;
        if !object.is_file() {
            return Err(DudError::ObjectMissing {
                checksum: artifact.checksum.clone(),
            });
        }

        let workspace = root.join(&artifact.path);
        if let Some(parent) = workspace.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DudError::cache_io("checkout", parent.to_path_buf(), e))?;
        }
        if workspace.exists() {
            fs::remove_file(&workspace)
                .map_err(|e| DudError::cache_io("checkout", workspace.clone(), e))?;
        }

        match strategy {
            CheckoutStrategy::Link => {
                link_or_copy(&object, &workspace)
                    .map_err(|e| DudError::cache_io("checkout", workspace.clone(), e))?;
            }
            CheckoutStrategy::Copy => {
                fs::copy(&object, &workspace)
                    .map_err(|e| DudError::cache_io("checkout", workspace.clone(), e))?;
            }
        }
        Ok(())
    }

    fn fetch(&self, remote: &Path, artifacts: &[&Artifact]) -> DudResult<()> {
        for artifact in artifacts {
            if !artifact.has_checksum() {
                return Err(DudError::MissingChecksum {
                    path: artifact.path.clone(),
                });
            }
            let rel = self.path_for_checksum(&artifact.checksum)?;
            let local = self.dir.join(&rel);
            if local.is_file() {
                continue;
            }

            let remote_object = remote.join(&rel);
            if !remote_object.is_file() {
                return Err(DudError::ObjectMissing {
                    checksum: artifact.checksum.clone(),
                });
            }
            if let Some(parent) = local.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| DudError::cache_io("fetch", parent.to_path_buf(), e))?;
            }
            debug!("fetching {} from {}", artifact.checksum, remote.display());
            fs::copy(&remote_object, &local)
                .map_err(|e| DudError::cache_io("fetch", remote_object, e))?;
        }
        Ok(())
    }

    fn path_for_checksum(&self, checksum: &str) -> DudResult<PathBuf> {
        if checksum.len() < 3 || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DudError::InvalidChecksum(checksum.to_string()));
        }
        Ok(PathBuf::from(&checksum[..2]).join(&checksum[2..]))
    }
}

fn file_len(path: &Path) -> DudResult<u64> {
    Ok(fs::metadata(path)
        .map_err(|e| DudError::cache_io("status", path.to_path_buf(), e))?
        .len())
}
