//! Error types for gpumon

use std::io;
use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors produced by the query backends, the CSV sink, and the sampling loop
#[derive(Error, Debug)]
pub enum MonitorError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// NVML error
    #[cfg(feature = "nvidia")]
    #[error("NVML error: {0}")]
    Nvml(#[from] nvml_wrapper::error::NvmlError),

    /// External command failed to launch or exited non-zero
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// External command exceeded its time bound
    #[error("Command timed out: {0}")]
    CommandTimeout(String),

    /// Malformed tool output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Backend initialization failed
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Nix error (Unix)
    #[cfg(unix)]
    #[error("Nix error: {0}")]
    Nix(#[from] nix::Error),
}
