//! Document mapper: authoritative record to search document.
//!
//! The mapping is a pure transform with no failure mode. A malformed or
//! sparse record yields a document with the unmappable fields absent rather
//! than an error, since indexing is best-effort relative to the source of
//! truth.

use crate::types::{FieldValue, SearchDocument, SourceRecord};

/// Map an authoritative record to its search document.
///
/// Deterministic and total: the same record always yields the same document,
/// and every valid record yields one. Derived fields (`full_name`) are
/// computed here so the index never stores anything not derivable from the
/// source record.
pub fn map_record(record: &SourceRecord) -> SearchDocument {
    let mut doc = SearchDocument::new(record.id.clone());

    if let Some(first) = non_empty(record.first_name.as_deref()) {
        doc = doc.with_field("first_name", FieldValue::Text(first));
    }
    if let Some(last) = non_empty(record.last_name.as_deref()) {
        doc = doc.with_field("last_name", FieldValue::Text(last));
    }
    if let Some(full) = record.full_name() {
        doc = doc.with_field("full_name", FieldValue::Text(full));
    }
    if let Some(email) = non_empty(record.email.as_deref()) {
        doc = doc.with_field("email", FieldValue::Keyword(email));
    }
    if let Some(bio) = non_empty(record.bio.as_deref()) {
        doc = doc.with_field("bio", FieldValue::Text(bio));
    }

    doc.with_field("active", FieldValue::Bool(record.active))
        .with_field("updated_at", FieldValue::Timestamp(record.updated_at))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
