//! Error types for the synchronization engine.

use thiserror::Error;

use index_sync_repository::SearchIndexError;

/// Errors that can occur in the synchronization engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A reindex is already in progress.
    #[error("A reindex is already in progress")]
    ReindexAlreadyRunning,

    /// Error from the search index backend.
    #[error("Index error: {0}")]
    IndexError(#[from] SearchIndexError),
}

impl SyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
