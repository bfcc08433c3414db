//! Search index error types.
//!
//! The error taxonomy distinguishes transient failures (retried with
//! backoff) from non-transient ones (failed immediately) and from local
//! circuit-open rejections (failed fast without touching the backend).

use thiserror::Error;

/// Unified errors from search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., malformed document, empty generation name).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level failure reaching the search backend.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A backend call exceeded its timeout.
    #[error("Timeout during {0}")]
    Timeout(String),

    /// The backend throttled the request.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// The backend returned a non-success HTTP status.
    #[error("Backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    /// Failed to serialize a request or parse a backend response.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A bulk request was rejected wholesale (not per-item failures).
    #[error("Bulk operation rejected: {0}")]
    BulkRejected(String),

    /// Alias swap failed after exhausting its bounded retries.
    #[error("Alias swap failed: {0}")]
    AliasSwap(String),

    /// A named index generation does not exist.
    #[error("Generation not found: {0}")]
    GenerationNotFound(String),

    /// The circuit breaker is open; the backend was not called.
    #[error("Circuit open, rejected call to {0}")]
    CircuitOpen(&'static str),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout(operation.into())
    }

    /// Create a throttled error.
    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    /// Create a backend error from an HTTP status and message.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a bulk rejection error.
    pub fn bulk_rejected(msg: impl Into<String>) -> Self {
        Self::BulkRejected(msg.into())
    }

    /// Create an alias swap error.
    pub fn alias_swap(msg: impl Into<String>) -> Self {
        Self::AliasSwap(msg.into())
    }

    /// Create a generation-not-found error.
    pub fn generation_not_found(name: impl Into<String>) -> Self {
        Self::GenerationNotFound(name.into())
    }

    /// Whether the failure is transient and worth retrying with backoff.
    ///
    /// Timeouts, throttling, transport failures and 5xx-equivalent backend
    /// responses are transient. Validation errors, 4xx responses and
    /// circuit-open rejections are not: retrying them only adds noise.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::Throttled(_) => true,
            Self::Backend { status, .. } => *status >= 500,
            Self::Validation(_)
            | Self::Serialization(_)
            | Self::BulkRejected(_)
            | Self::AliasSwap(_)
            | Self::GenerationNotFound(_)
            | Self::CircuitOpen(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchIndexError::timeout("bulk_upsert").is_transient());
        assert!(SearchIndexError::throttled("429").is_transient());
        assert!(SearchIndexError::connection("refused").is_transient());
        assert!(SearchIndexError::backend(503, "unavailable").is_transient());

        assert!(!SearchIndexError::backend(400, "bad request").is_transient());
        assert!(!SearchIndexError::validation("empty id").is_transient());
        assert!(!SearchIndexError::CircuitOpen("query").is_transient());
        assert!(!SearchIndexError::alias_swap("exhausted").is_transient());
    }
}
