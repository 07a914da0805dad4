//! Error types and exit codes for search-indexer

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for search-indexer operations
///
/// Only failures that abort a run live here. Per-record anomalies (an
/// unresolved value hash, a profile field with an unexpected shape) are
/// counted in the stage stats instead.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Malformed input {path}: {message}")]
    MalformedInput { path: String, message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Resolver fetch failed: {message}")]
    RemoteFetch { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Convert error to the process exit code:
    /// - 0: Success
    /// - 1: Malformed snapshot / IO error
    /// - 2: Configuration error
    /// - 3: Store error
    /// - 4: Resolver fetch error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::MalformedInput { .. } => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
            Self::Config { .. } => ExitCode::from(2),
            Self::Store { .. } => ExitCode::from(3),
            Self::RemoteFetch { .. } => ExitCode::from(4),
        }
    }
}

impl From<rusqlite::Error> for IndexerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store {
            message: e.to_string(),
        }
    }
}

/// Result type alias for search-indexer operations
pub type Result<T> = std::result::Result<T, IndexerError>;
