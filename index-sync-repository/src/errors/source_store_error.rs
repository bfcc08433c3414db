//! Authoritative store error types.

use thiserror::Error;

/// Errors from the authoritative-store reader.
#[derive(Debug, Clone, Error)]
pub enum SourceStoreError {
    /// Failed to reach the authoritative store.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A store query failed.
    #[error("Store query error: {0}")]
    Query(String),
}

impl SourceStoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}
