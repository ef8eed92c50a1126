//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use mapfetch::cache::CacheError;
use mapfetch::config::ConfigFileError;
use mapfetch::service::ServiceError;
use std::process;
use thiserror::Error;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to start the fetch service
    #[error("Failed to start service: {0}")]
    Service(#[from] ServiceError),

    /// One or more resources could not be fetched
    #[error("{failed} of {total} resources failed")]
    Fetch { failed: usize, total: usize },

    /// Cache operation failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Failed to write output file
    #[error("Failed to write file '{path}': {error}")]
    FileWrite {
        path: String,
        #[source]
        error: std::io::Error,
    },

    /// Failed to create the async runtime
    #[error("Failed to create runtime: {0}")]
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'mapfetch config path' to locate the configuration file,");
                eprintln!("or 'mapfetch config init' to create one with defaults.");
            }
            CliError::Fetch { .. } => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Missing access token: set access_token in config.ini or use --token");
                eprintln!("  2. Network unreachable: check proxy and firewall settings");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
