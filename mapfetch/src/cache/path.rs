//! Cache path construction.

use crate::normalize::NormalizedUrl;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File extension for cache entries.
pub(crate) const CACHE_FILE_EXTENSION: &str = "bin";

/// File name (without directory) for a cached URL: the SHA-256 hex digest.
///
/// # Example
///
/// ```
/// use mapfetch::cache::cache_file_name;
/// use mapfetch::normalize::NormalizedUrl;
///
/// let name = cache_file_name(&NormalizedUrl::new("https://example.com/a"));
/// assert_eq!(name.len(), 64);
/// ```
pub fn cache_file_name(url: &NormalizedUrl) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(digest)
}

/// Full path for a cached URL.
///
/// Entries are sharded by the first two hex characters of the digest:
/// ```text
/// <cache_dir>/<ab>/<abcdef...>.bin
/// ```
pub fn cache_path(cache_dir: &Path, url: &NormalizedUrl) -> PathBuf {
    let name = cache_file_name(url);
    cache_dir
        .join(&name[..2])
        .join(format!("{}.{}", name, CACHE_FILE_EXTENSION))
}
