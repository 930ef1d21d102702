/// Error types shared by the storage and container runtime layers

use std::path::PathBuf;
use thiserror::Error;

/// The registry or recorder could not be read or written
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

/// Failure talking to the container runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("container '{0}' not found")]
    NotFound(String),

    #[error("container runtime unreachable: {0}")]
    Unreachable(String),

    #[error("container runtime error: {0}")]
    Api(String),
}
