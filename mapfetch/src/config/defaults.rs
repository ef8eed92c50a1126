//! Default values for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::cache::DEFAULT_CACHE_MAX_SIZE;
use crate::coordinator::MaxConcurrentTransfers;
use crate::normalize::DEFAULT_API_BASE_URL;
use crate::transport::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "mapfetch.log";

/// Default cache directory: the platform cache directory plus `mapfetch`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapfetch")
}

/// Default log directory: `~/.mapfetch/logs`.
pub fn default_log_dir() -> PathBuf {
    config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            network: NetworkSettings {
                access_token: None,
                api_base_url: DEFAULT_API_BASE_URL.to_string(),
                managed_hosts: Vec::new(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                timeout: DEFAULT_TIMEOUT_SECS,
                ca_bundle: None,
            },
            cache: CacheSettings {
                directory: default_cache_dir(),
                max_size: DEFAULT_CACHE_MAX_SIZE,
                enabled: true,
            },
            coordinator: CoordinatorSettings {
                max_concurrent_transfers: MaxConcurrentTransfers::default(),
            },
            logging: LoggingSettings {
                directory: default_log_dir(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
