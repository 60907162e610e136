//! Error types for LogFS
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LogFsError
pub type Result<T> = std::result::Result<T, LogFsError>;

/// Unified error type for LogFS operations
#[derive(Debug, Error)]
pub enum LogFsError {
    // -------------------------------------------------------------------------
    // Append Errors
    // -------------------------------------------------------------------------
    /// The write buffer cannot hold the whole record right now.
    /// Nothing was written; retry after a flush drains the buffer.
    #[error("out of space: requested {requested} bytes, {available} available")]
    OutOfSpace { requested: usize, available: usize },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Open Errors
    // -------------------------------------------------------------------------
    #[error("out of memory: failed to allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },

    #[error("device error at {}: {source}", path.display())]
    Device {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogFsError {
    /// True if the error is transient backpressure rather than a failure
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, LogFsError::OutOfSpace { .. })
    }
}
