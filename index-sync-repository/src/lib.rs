//! Backend interfaces and implementations for the search index
//! synchronization engine.
//!
//! This crate defines the two narrow interfaces that bound the engine to
//! its collaborators:
//!
//! - [`SearchIndexBackend`]: the search backend (OpenSearch implementation
//!   provided), abstracted so business logic never branches on the backend.
//! - [`SourceStore`]: a paginated reader over the authoritative store, used
//!   by the reindex orchestrator and the degraded query fallback.
//!
//! It also provides the plumbing around the backend: [`SearchIndexClient`]
//! (timeouts, retry with backoff, circuit breaking) and the
//! [`CircuitBreaker`] itself.

pub mod breaker;
pub mod client;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod retry;
pub mod stores;
pub mod types;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{ClientConfig, SearchIndexClient};
pub use errors::{SearchIndexError, SourceStoreError};
pub use interfaces::{RecordPage, SearchIndexBackend, SourceStore};
pub use opensearch::OpenSearchBackend;
pub use retry::RetryPolicy;
pub use stores::MemoryStore;
pub use types::{BulkItemResult, BulkSummary};
