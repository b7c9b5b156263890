//! Checkpoint errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Bad constructor input (empty directory or blank name).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to create the checkpoint file.
    #[error("Failed to create checkpoint file at {path}: {source}")]
    FileCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove the checkpoint file.
    #[error("Failed to remove checkpoint file at {path}: {source}")]
    FileRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The waiter could not open or lock the checkpoint file.
    #[error("Waiter could not hold checkpoint file at {path}: {source}")]
    WaiterIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the background waiter was cut short.
    #[error("Checkpoint wait cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error while loading configuration.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected constructor input.
    InvalidArgument,
    /// The filesystem refused an operation.
    Io,
    /// A wait on the waiter was interrupted or timed out.
    Cancellation,
    /// Configuration could not be loaded or validated.
    Config,
}

impl CheckpointError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckpointError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CheckpointError::FileCreation { .. }
            | CheckpointError::FileRemoval { .. }
            | CheckpointError::WaiterIo { .. }
            | CheckpointError::Io(_) => ErrorKind::Io,
            CheckpointError::Cancelled(_) => ErrorKind::Cancellation,
            CheckpointError::Config(_) | CheckpointError::TomlParse(_) => ErrorKind::Config,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::Io => write!(f, "io"),
            ErrorKind::Cancellation => write!(f, "cancellation"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}
