//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::coordinator::MaxConcurrentTransfers;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Network and managed hosting settings
    pub network: NetworkSettings,
    /// Persistent cache settings
    pub cache: CacheSettings,
    /// Request coordinator settings
    pub coordinator: CoordinatorSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    /// Access token appended to managed URLs
    pub access_token: Option<String>,
    /// Base URL that `mapbox://` URLs are rewritten against
    pub api_base_url: String,
    /// Extra hosts whose `http(s)` URLs also receive the access token
    pub managed_hosts: Vec<String>,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// PEM bundle with additional trusted root certificates
    pub ca_bundle: Option<PathBuf>,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Cache directory path
    pub directory: PathBuf,
    /// Maximum cache size in bytes
    pub max_size: usize,
    /// Whether the persistent cache is used at all
    pub enabled: bool,
}

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    pub max_concurrent_transfers: MaxConcurrentTransfers,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
