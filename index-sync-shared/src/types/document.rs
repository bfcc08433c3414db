//! Search document types.
//!
//! A [`SearchDocument`] is the unit that gets indexed and queried. It is a
//! projection of an authoritative record, produced by the document mapper.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A typed field value inside a search document.
///
/// Serializes untagged, so a document renders as a flat JSON object the
/// search backend can index directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Full-text searchable string.
    Text(String),
    /// Exact-match string (not analyzed).
    Keyword(String),
    /// Boolean flag.
    Bool(bool),
    /// Timestamp field.
    Timestamp(DateTime<Utc>),
    /// Numeric field.
    Number(f64),
}

/// The unit indexed and queried by the search backend.
///
/// Invariant: a document for a given `id` is a pure function of the
/// authoritative record it was mapped from; every field is derivable from
/// that record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDocument {
    /// Stable identifier, equal to the authoritative record's primary key.
    pub id: String,
    /// Ordered field name to value mapping.
    pub fields: BTreeMap<String, FieldValue>,
}

impl SearchDocument {
    /// Create an empty document for the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
