//! Authoritative-store reader trait definition.

use async_trait::async_trait;

use index_sync_shared::SourceRecord;

use crate::errors::SourceStoreError;

/// A page of records from the authoritative store.
#[derive(Debug, Clone)]
pub struct RecordPage {
    /// The records in primary-key ascending order.
    pub records: Vec<SourceRecord>,
    /// Whether more records exist after this page.
    pub has_more: bool,
}

/// Read-only view of the authoritative transactional store.
///
/// The engine consumes the store through this narrow interface: cursor
/// pagination for the reindex orchestrator, and a bounded direct query for
/// the degraded search fallback. The store's schema and SQL dialect stay on
/// the other side of this trait.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Fetch the next page of records after `after_key`, in primary-key
    /// ascending order.
    ///
    /// Stable ordering guarantees the reindex terminates and never skips or
    /// duplicates rows under concurrent writes.
    async fn fetch_page(
        &self,
        after_key: Option<&str>,
        page_size: usize,
    ) -> Result<RecordPage, SourceStoreError>;

    /// Bounded direct query used by the degraded search path.
    ///
    /// Implementations must enforce `limit` as a hard cap to avoid
    /// unbounded table scans.
    async fn fallback_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, SourceStoreError>;
}
