//! Query façade over the search index with a degraded fallback.
//!
//! The façade never returns an error: an unreachable or circuit-broken
//! index degrades to a bounded direct query against the authoritative
//! store, and the response is flagged so callers can tell the difference.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, warn};

use index_sync_shared::{SearchHit, SearchRequest, SearchResponse};
use index_sync_repository::{SearchIndexClient, SourceStore};

/// Default cap on results served from the fallback path.
const DEFAULT_FALLBACK_LIMIT: usize = 20;

/// Search entry point with index-or-fallback routing.
pub struct QueryFacade {
    client: Arc<SearchIndexClient>,
    store: Arc<dyn SourceStore>,
    alias: String,
    fallback_limit: usize,
}

impl QueryFacade {
    /// Create a façade querying `alias` with the default fallback cap.
    pub fn new(
        client: Arc<SearchIndexClient>,
        store: Arc<dyn SourceStore>,
        alias: String,
    ) -> Self {
        Self {
            client,
            store,
            alias,
            fallback_limit: DEFAULT_FALLBACK_LIMIT,
        }
    }

    /// Override the fallback result cap.
    pub fn with_fallback_limit(mut self, limit: usize) -> Self {
        self.fallback_limit = limit;
        self
    }

    /// Execute a search.
    ///
    /// Invalid requests yield an empty response rather than an error, and
    /// index failures degrade to the authoritative store. The degraded
    /// path is capped harder than the index path because it cannot rank.
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        if let Err(reason) = request.validate() {
            warn!(reason = %reason, "Rejected invalid search request");
            return SearchResponse::empty();
        }

        match self.client.query(&self.alias, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Search index unavailable, falling back to source store");
                self.fallback(request).await
            }
        }
    }

    async fn fallback(&self, request: &SearchRequest) -> SearchResponse {
        let started = Instant::now();
        let limit = request.limit.min(self.fallback_limit);

        match self.store.fallback_search(&request.query, limit).await {
            Ok(records) => {
                let hits: Vec<SearchHit> = records.iter().map(SearchHit::from_record).collect();
                SearchResponse::degraded(hits, started.elapsed().as_millis() as u64)
            }
            Err(e) => {
                error!(error = %e, "Fallback search failed, returning empty degraded response");
                SearchResponse::degraded(Vec::new(), started.elapsed().as_millis() as u64)
            }
        }
    }
}
