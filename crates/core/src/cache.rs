//! Disk cache for intermediate JSON payloads.
//!
//! Expensive remote results (a full podcast generation run takes
//! minutes) are cached under a configurable directory so that repeated
//! runs with the same prompt replay the stored response instead of
//! re-submitting the job.

use std::path::{Path, PathBuf};

/// File-per-key cache rooted at a single directory.
///
/// Reads are best-effort: any I/O failure is treated as a miss. Writes
/// create the cache directory on demand.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this cache stores its entries in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a cached entry, returning `None` on a miss or read failure.
    pub async fn read(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(key, "Cache hit");
                Some(bytes)
            }
            Err(_) => None,
        }
    }

    /// Write a cache entry, creating the cache directory if needed.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(key);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "Cache entry written");
        Ok(())
    }
}

/// djb2 string hash, kept bit-compatible with the cache keys written by
/// earlier versions of the pipeline (hashing UTF-16 code units into a
/// wrapping u32).
pub fn djb2(input: &str) -> u32 {
    let mut hash: u32 = 5381;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(unit as u32);
    }
    hash
}
