//! Error types for Sweeper operations

use thiserror::Error;

/// Errors that can occur during Sweeper operations
#[derive(Error, Debug)]
pub enum SweeperError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
