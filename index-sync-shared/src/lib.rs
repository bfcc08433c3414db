//! Shared types and data structures for the search index synchronization engine.

pub mod mapper;
pub mod types;

pub use mapper::map_record;
pub use types::{
    ChangeKind, FieldValue, SearchDocument, SearchHit, SearchRequest, SearchResponse, SourceRecord,
};
