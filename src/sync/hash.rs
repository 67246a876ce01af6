//! Content hashing for change detection.
//!
//! The watcher compares the hash of a file on disk against the hash recorded
//! when the tracker itself wrote it. Matching hashes mean the event is an echo
//! of our own write.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Compute the SHA256 hex digest of raw bytes.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of the file at `path`, or `None` if it cannot be read.
#[must_use]
pub fn file_hash(path: &Path) -> Option<String> {
    std::fs::read(path).ok().map(|bytes| content_hash(&bytes))
}
