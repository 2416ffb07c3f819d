//! Streaming content hashing for indexed files.
//!
//! Computes a SHA-256 digest of a file's full byte content in fixed-size
//! chunks, so memory use stays bounded for multi-gigabyte stems and
//! projects. The digest is the file's content identity and feeds duplicate
//! detection.

use crate::error::{LibraryError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files (8MB, optimal for SSDs).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Compute the SHA-256 digest of a file as a lowercase hex string.
///
/// Fails with an IO error carrying the path when the file cannot be read;
/// callers treat this as a per-file failure.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| LibraryError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| LibraryError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Async wrapper over [`hash_file`].
///
/// File I/O is blocking, so the hash runs on the blocking thread pool.
pub async fn hash_file_async(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(|e| LibraryError::Other(format!("Hashing task failed: {e}")))?
}
