//! Common error types for AV QC

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for AV QC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the store, configuration and task layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage root for packages awaiting QC is missing or not a directory.
    /// Fatal for every task: nothing is processed.
    #[error("Root directory {} for files waiting to be QCed does not exist.", .0.display())]
    StorageRootMissing(PathBuf),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored value could not be decoded into a model
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}
