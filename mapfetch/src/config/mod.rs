//! Configuration file handling for `~/.mapfetch/config.ini`.
//!
//! The INI file has one section per concern:
//!
//! ```ini
//! [network]
//! access_token = pk.abc
//! api_base_url = https://api.mapbox.com
//! managed_hosts = tiles.example.com
//! timeout = 30
//!
//! [cache]
//! path = ~/.cache/mapfetch
//! max_size = 50MB
//!
//! [coordinator]
//! max_concurrent_transfers = 4
//! ```
//!
//! A missing file yields defaults; a present file overlays its values on the
//! defaults.
//!
//! # Example
//!
//! ```
//! use mapfetch::config::{parse_size, ConfigFile};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.cache.max_size, parse_size("50MB").unwrap());
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, CoordinatorSettings, LoggingSettings, NetworkSettings};
pub use size::{format_size, parse_size, Size, SizeParseError};
