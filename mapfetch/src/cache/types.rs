//! Core types for the cache system.

use std::path::PathBuf;
use thiserror::Error;

/// Default maximum cache size: 50 MB.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 50 * 1024 * 1024;

/// Cache-related errors.
///
/// These never reach a caller of the coordinator; a failing cache only
/// degrades to fetching from the network.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single entry is larger than the whole cache
    #[error("Entry of {size} bytes exceeds cache limit of {limit} bytes")]
    EntryTooLarge { size: usize, limit: usize },

    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Persistent cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the cache files
    pub directory: PathBuf,
    /// Maximum total size in bytes
    pub max_size_bytes: usize,
    /// When false no cache is used at all
    pub enabled: bool,
}

impl CacheConfig {
    pub fn new(directory: impl Into<PathBuf>, max_size_bytes: usize) -> Self {
        Self {
            directory: directory.into(),
            max_size_bytes,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            directory: settings.directory.clone(),
            max_size_bytes: settings.max_size,
            enabled: settings.enabled,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let directory = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mapfetch");

        Self {
            directory,
            max_size_bytes: DEFAULT_CACHE_MAX_SIZE,
            enabled: true,
        }
    }
}
