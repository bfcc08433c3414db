//! Search response types.

use serde::{Deserialize, Serialize};

use crate::types::record::SourceRecord;

/// A single search result item.
///
/// Hits carry only the projected document fields. Callers needing the full
/// authoritative detail fetch the record by id after the search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// The record's unique identifier.
    pub id: String,

    /// Derived display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Free-form profile text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Whether the record is active.
    #[serde(default)]
    pub active: bool,

    /// Relevance score from the search backend.
    /// Zero for results served from the fallback path.
    #[serde(default)]
    pub relevance_score: f64,
}

impl SearchHit {
    /// Build a hit directly from an authoritative record.
    ///
    /// Used by the degraded fallback path, which never touches the index.
    pub fn from_record(record: &SourceRecord) -> Self {
        Self {
            id: record.id.clone(),
            full_name: record.full_name(),
            email: record.email.clone(),
            bio: record.bio.clone(),
            active: record.active,
            relevance_score: 0.0,
        }
    }
}

/// Complete search response with results and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    /// The list of search results, ordered by relevance.
    pub results: Vec<SearchHit>,

    /// Total number of matching documents.
    /// May be greater than the number of returned results due to pagination.
    pub total: u64,

    /// Time taken to execute the search in milliseconds.
    pub took_ms: u64,

    /// True when the results came from the authoritative-store fallback
    /// instead of the search index.
    #[serde(default)]
    pub degraded: bool,
}

impl SearchResponse {
    /// Create an empty, non-degraded response.
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            took_ms: 0,
            degraded: false,
        }
    }

    /// Create an index-backed response.
    pub fn new(results: Vec<SearchHit>, total: u64, took_ms: u64) -> Self {
        Self {
            results,
            total,
            took_ms,
            degraded: false,
        }
    }

    /// Create a degraded response from fallback results.
    pub fn degraded(results: Vec<SearchHit>, took_ms: u64) -> Self {
        let total = results.len() as u64;
        Self {
            results,
            total,
            took_ms,
            degraded: true,
        }
    }

    /// Returns true if there are no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the number of results in this response.
    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response() {
        let response = SearchResponse::empty();
        assert!(response.is_empty());
        assert_eq!(response.len(), 0);
        assert!(!response.degraded);
    }

    #[test]
    fn test_degraded_response() {
        let record = SourceRecord::new("r1").with_name("Ada", "Lovelace");
        let response = SearchResponse::degraded(vec![SearchHit::from_record(&record)], 3);

        assert!(response.degraded);
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].full_name, Some("Ada Lovelace".to_string()));
        assert_eq!(response.results[0].relevance_score, 0.0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let response = SearchResponse::new(
            vec![SearchHit {
                id: "r1".to_string(),
                full_name: Some("Ada Lovelace".to_string()),
                email: None,
                bio: None,
                active: true,
                relevance_score: 2.5,
            }],
            1,
            10,
        );

        let json = serde_json::to_string(&response).unwrap();
        let decoded: SearchResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(response, decoded);
    }
}
