//! Error types for backend and store operations.

pub mod search_index_error;
pub mod source_store_error;

pub use search_index_error::SearchIndexError;
pub use source_store_error::SourceStoreError;
