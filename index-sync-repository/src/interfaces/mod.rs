//! Abstract interfaces for external collaborators.

pub mod index_backend;
pub mod source_store;

pub use index_backend::SearchIndexBackend;
pub use source_store::{RecordPage, SourceStore};
