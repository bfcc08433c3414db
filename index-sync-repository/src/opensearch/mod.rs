//! OpenSearch implementation of the search index backend.

pub mod index_config;
pub mod provider;

pub use provider::OpenSearchBackend;
