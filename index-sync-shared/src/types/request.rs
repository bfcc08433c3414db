//! Search request types.

use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    20
}

/// Search request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The search query string.
    pub query: String,

    /// Maximum number of results to return.
    /// Default is 20, maximum is 100.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: usize,
}

impl SearchRequest {
    /// Create a new request with default limit and offset.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_limit(),
            offset: 0,
        }
    }

    /// Set the result limit (capped at 100).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(100);
        self
    }

    /// Set the pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Validate the request parameters.
    ///
    /// Returns an error message if validation fails. The limit cap applies
    /// here as well as in [`with_limit`](Self::with_limit): requests arrive
    /// deserialized from callers that never went through the builder.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("Query string cannot be empty".to_string());
        }

        if self.query.len() < 2 {
            return Err("Query must be at least 2 characters".to_string());
        }

        if self.limit > 100 {
            return Err("Limit cannot exceed 100".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = SearchRequest::new("ada");
        assert_eq!(request.limit, 20);
        assert_eq!(request.offset, 0);
    }

    #[test]
    fn test_validation() {
        assert!(SearchRequest::new("ada").validate().is_ok());
        assert!(SearchRequest::new("").validate().is_err());
        assert!(SearchRequest::new("   ").validate().is_err());
        assert!(SearchRequest::new("a").validate().is_err());
    }

    #[test]
    fn test_with_limit_caps_at_100() {
        let request = SearchRequest::new("ada").with_limit(500);
        assert_eq!(request.limit, 100);
    }

    #[test]
    fn test_deserialized_over_limit_is_rejected() {
        // Requests from the serving layer bypass the builder, so the cap
        // must hold for deserialized values too.
        let request: SearchRequest =
            serde_json::from_str(r#"{"query":"ada","limit":99999}"#).unwrap();
        assert!(request.validate().is_err());

        let request: SearchRequest =
            serde_json::from_str(r#"{"query":"ada","limit":100}"#).unwrap();
        assert!(request.validate().is_ok());
    }
}
