//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and the async
//! runtime to reduce duplication across command handlers.

use crate::error::CliError;
use mapfetch::config::{config_file_path, ConfigFile};
use mapfetch::logging::{init_console_logging, init_logging, LoggingGuard};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Alternate configuration file
    pub config: Option<PathBuf>,
    /// Debug-level console logging
    pub verbose: bool,
    /// Also write the log file configured in `[logging]`
    pub log_file: bool,
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps file logging active while runner exists
    _logging_guard: Option<LoggingGuard>,
    /// Loaded configuration file
    config: ConfigFile,
    /// Where the configuration was loaded from
    config_path: PathBuf,
}

impl CliRunner {
    /// Load configuration and initialize logging.
    ///
    /// A missing configuration file yields defaults.
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let config_path = options.config.clone().unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard = if options.log_file {
            let guard = init_logging(&config.logging.directory, &config.logging.file).map_err(
                |e| CliError::FileWrite {
                    path: config.logging.directory.display().to_string(),
                    error: e,
                },
            )?;
            Some(guard)
        } else {
            init_console_logging(options.verbose);
            None
        };

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("MapFetch v{}", mapfetch::VERSION);
        info!(config = %self.config_path.display(), "MapFetch CLI: {} command", command);
    }

    /// Run `future` to completion on a fresh multi-threaded runtime.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;
        Ok(runtime.block_on(future))
    }
}
