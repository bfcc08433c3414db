//! In-memory authoritative store.
//!
//! Keeps records in a `BTreeMap` keyed by record id, which gives the stable
//! primary-key ordering that cursor pagination relies on. Used by the
//! default wiring and throughout the integration tests.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use index_sync_shared::SourceRecord;

use crate::errors::SourceStoreError;
use crate::interfaces::{RecordPage, SourceStore};

/// In-memory [`SourceStore`] backed by a sorted map.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, SourceRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given records.
    pub async fn with_records(records: Vec<SourceRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record).await;
        }
        store
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: SourceRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    /// Remove a record by id. Returns the removed record, if any.
    pub async fn remove(&self, id: &str) -> Option<SourceRecord> {
        self.records.write().await.remove(id)
    }

    /// Number of records in the store.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn matches_query(record: &SourceRecord, needle: &str) -> bool {
    let contains = |field: Option<&str>| {
        field
            .map(|v| v.to_lowercase().contains(needle))
            .unwrap_or(false)
    };

    contains(record.full_name().as_deref())
        || contains(record.email.as_deref())
        || contains(record.bio.as_deref())
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn fetch_page(
        &self,
        after_key: Option<&str>,
        page_size: usize,
    ) -> Result<RecordPage, SourceStoreError> {
        let records = self.records.read().await;

        let range = match after_key {
            Some(after) => records.range::<str, _>((Bound::Excluded(after), Bound::Unbounded)),
            None => records.range::<str, _>((Bound::Unbounded, Bound::Unbounded)),
        };

        let mut page: Vec<SourceRecord> = Vec::with_capacity(page_size.min(records.len()));
        let mut has_more = false;
        for (_, record) in range {
            if page.len() == page_size {
                has_more = true;
                break;
            }
            page.push(record.clone());
        }

        debug!(
            after = after_key.unwrap_or("<start>"),
            returned = page.len(),
            has_more,
            "Fetched record page"
        );

        Ok(RecordPage {
            records: page,
            has_more,
        })
    }

    async fn fallback_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, SourceStoreError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| matches_query(record, &needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, first: &str, last: &str) -> SourceRecord {
        SourceRecord::new(id).with_name(first, last)
    }

    #[tokio::test]
    async fn test_fetch_page_paginates_in_key_order() {
        let store = MemoryStore::with_records(vec![
            record("c", "Carol", "Chen"),
            record("a", "Ada", "Lovelace"),
            record("b", "Bob", "Barker"),
        ])
        .await;

        let first = store.fetch_page(None, 2).await.unwrap();
        assert_eq!(
            first.records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(first.has_more);

        let second = store.fetch_page(Some("b"), 2).await.unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].id, "c");
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn test_fetch_page_empty_store() {
        let store = MemoryStore::new();
        let page = store.fetch_page(None, 10).await.unwrap();
        assert!(page.records.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_fallback_search_matches_name_and_email() {
        let store = MemoryStore::with_records(vec![
            record("1", "Ada", "Lovelace").with_email("ada@example.com"),
            record("2", "Grace", "Hopper").with_email("grace@example.com"),
        ])
        .await;

        let by_name = store.fallback_search("lovelace", 10).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "1");

        let by_email = store.fallback_search("GRACE@", 10).await.unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, "2");
    }

    #[tokio::test]
    async fn test_fallback_search_enforces_limit() {
        let mut records = Vec::new();
        for i in 0..10 {
            records.push(record(&format!("{i}"), "Ada", "Lovelace"));
        }
        let store = MemoryStore::with_records(records).await;

        let hits = store.fallback_search("ada", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_search_blank_query_is_empty() {
        let store = MemoryStore::with_records(vec![record("1", "Ada", "Lovelace")]).await;
        let hits = store.fallback_search("   ", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
