//! Shared type definitions.

pub mod document;
pub mod record;
pub mod request;
pub mod response;

pub use document::{FieldValue, SearchDocument};
pub use record::{ChangeKind, SourceRecord};
pub use request::SearchRequest;
pub use response::{SearchHit, SearchResponse};
