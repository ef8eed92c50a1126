//! Service error types.

use crate::config::ConfigFileError;
use crate::transport::TransportError;
use std::io;
use thiserror::Error;

/// Errors that can occur while starting or using a [`FetchService`](super::FetchService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Failed to create the HTTP transport
    #[error("HTTP client error: {0}")]
    Transport(#[from] TransportError),

    /// I/O error (log directory, output files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Must be called from within a Tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The coordinator stopped before answering
    #[error("Service not running: {0}")]
    NotRunning(String),
}
