//! Content hashing for artifacts and stage fingerprints
//!
//! Everything in the cache is keyed by SHA-256 hex digests. The same hash
//! must be used for file contents, stage definitions, and stage keys;
//! mixing hashes would invalidate every cached object.

use crate::error::{DudError, DudResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hash a byte stream, returning the full 64-char hex digest
pub fn checksum<R: Read>(mut reader: R) -> DudResult<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| DudError::io("hashing stream", e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hash a file's contents
pub fn checksum_file(path: &Path) -> DudResult<String> {
    let file = File::open(path)
        .map_err(|e| DudError::io(format!("opening {} for hashing", path.display()), e))?;
    checksum(file)
}

/// Hash a list of hex digests after sorting it lexicographically.
///
/// The caller's ordering never affects the result.
pub fn checksum_of_sorted(mut sums: Vec<String>) -> String {
    sums.sort();
    let mut hasher = Sha256::new();
    for sum in &sums {
        hasher.update(sum.as_bytes());
    }
    hex::encode(hasher.finalize())
}
