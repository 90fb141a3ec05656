//! Error types for pool operations

use thiserror::Error;

/// Errors that can occur during lease and catalog operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Request was malformed; nothing was attempted
    #[error("{0}")]
    Validation(String),

    /// No matching entry
    #[error("Record not found!")]
    NotFound,

    /// Storage layer error, message kept verbatim
    #[error("{0}")]
    Store(String),
}
