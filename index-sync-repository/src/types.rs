//! Result types for bulk index operations.

use crate::errors::SearchIndexError;

/// Result of a bulk operation for a single document.
#[derive(Debug, Clone)]
pub struct BulkItemResult {
    /// The document's identifier.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

impl BulkItemResult {
    /// A successful item result.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
        }
    }

    /// A failed item result.
    pub fn failed(id: impl Into<String>, error: SearchIndexError) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of a bulk operation.
///
/// The backend may partially apply a batch: some documents indexed, others
/// rejected. Callers must inspect the per-item results and re-submit only
/// the failed items, never the whole batch.
#[derive(Debug, Clone)]
pub struct BulkSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item, in submission order.
    pub results: Vec<BulkItemResult>,
}

impl BulkSummary {
    /// An empty summary for a zero-item batch.
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    /// A summary where every item succeeded.
    pub fn all_ok(ids: impl IntoIterator<Item = String>) -> Self {
        let results: Vec<BulkItemResult> = ids.into_iter().map(BulkItemResult::ok).collect();
        Self {
            total: results.len(),
            succeeded: results.len(),
            failed: 0,
            results,
        }
    }

    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Iterate over the failed items.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
