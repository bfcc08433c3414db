//! Search index backend trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch,
//! Elasticsearch, etc.).

use async_trait::async_trait;

use index_sync_shared::{SearchDocument, SearchRequest, SearchResponse};

use crate::errors::SearchIndexError;
use crate::types::BulkSummary;

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into `SearchIndexClient` to enable
/// dependency injection and easy testing with mock implementations. Every
/// operation takes an explicit target (generation name or alias) so the
/// same backend serves both the live write path and a reindex building a
/// staging generation.
///
/// The alias target is owned by the backend and never cached client-side:
/// [`resolve_alias`](SearchIndexBackend::resolve_alias) queries it fresh on
/// each administrative or diagnostic need.
#[async_trait]
pub trait SearchIndexBackend: Send + Sync {
    /// Upsert a single document into the given index or alias.
    ///
    /// Creates the document if it doesn't exist, replaces its fields if it
    /// does.
    async fn upsert_one(
        &self,
        index: &str,
        document: &SearchDocument,
    ) -> Result<(), SearchIndexError>;

    /// Upsert multiple documents in one request.
    ///
    /// The backend may partially apply the batch. The returned summary
    /// carries a per-item result for every document in submission order, so
    /// the caller can re-submit only the failed items.
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<BulkSummary, SearchIndexError>;

    /// Delete a document by id.
    ///
    /// Deleting a document that was never indexed is a no-op, not an error.
    async fn delete(&self, index: &str, id: &str) -> Result<(), SearchIndexError>;

    /// Execute a search against the given index or alias.
    async fn query(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError>;

    /// Create a new, empty index generation with the engine's settings and
    /// mappings.
    async fn create_generation(&self, name: &str) -> Result<(), SearchIndexError>;

    /// Atomically repoint `alias` from `from` (if any) to `to`.
    ///
    /// Must be a single backend-side operation (remove-old and add-new in
    /// one request) so no reader ever observes the alias resolving to zero
    /// or two generations.
    async fn swap_alias(
        &self,
        alias: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), SearchIndexError>;

    /// Delete an index generation. Deleting a missing generation succeeds.
    async fn delete_generation(&self, name: &str) -> Result<(), SearchIndexError>;

    /// Resolve the generation currently referenced by `alias`, if any.
    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SearchIndexError>;
}
