//! Index backend client.
//!
//! Wraps a [`SearchIndexBackend`] with the failure-handling policy every
//! caller needs: per-request timeouts, retry with capped jittered backoff
//! for transient failures, and circuit breaking. The pipeline, the reindex
//! orchestrator and the query façade all go through this client; none of
//! them talk to the backend directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use index_sync_shared::{SearchDocument, SearchRequest, SearchResponse};

use crate::breaker::CircuitBreaker;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexBackend;
use crate::retry::RetryPolicy;
use crate::types::BulkSummary;

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout applied to every backend call.
    pub request_timeout: Duration,
    /// Bounded attempt count for alias swaps.
    pub swap_attempts: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            swap_attempts: 3,
        }
    }
}

/// Retrying, circuit-broken client over a search index backend.
///
/// Cheap to share: holds the backend and breaker behind `Arc`s and is safe
/// for concurrent use by the pipeline workers, the reindex task and the
/// query path.
pub struct SearchIndexClient {
    backend: Arc<dyn SearchIndexBackend>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
    config: ClientConfig,
}

impl SearchIndexClient {
    /// Create a client with default retry policy and configuration.
    pub fn new(backend: Arc<dyn SearchIndexBackend>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            backend,
            breaker,
            policy: RetryPolicy::default(),
            config: ClientConfig::default(),
        }
    }

    /// Create a client with custom retry policy and configuration.
    pub fn with_config(
        backend: Arc<dyn SearchIndexBackend>,
        breaker: Arc<CircuitBreaker>,
        policy: RetryPolicy,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            breaker,
            policy,
            config,
        }
    }

    /// The circuit breaker shared with this client.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Upsert a single document, retrying transient failures.
    pub async fn upsert_one(
        &self,
        index: &str,
        document: &SearchDocument,
    ) -> Result<(), SearchIndexError> {
        self.call_with_retry("upsert_one", &self.policy, || {
            self.backend.upsert_one(index, document)
        })
        .await
    }

    /// Upsert a batch of documents, retrying transient whole-call failures.
    ///
    /// Per-item failures inside an otherwise successful bulk response are
    /// NOT retried here: the returned summary carries them so the caller
    /// can re-submit only the failed items, never the whole batch.
    pub async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<BulkSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BulkSummary::empty());
        }
        self.call_with_retry("bulk_upsert", &self.policy, || {
            self.backend.bulk_upsert(index, documents)
        })
        .await
    }

    /// Delete a document by id, retrying transient failures.
    ///
    /// Deleting a document that was never indexed is a no-op.
    pub async fn delete(&self, index: &str, id: &str) -> Result<(), SearchIndexError> {
        self.call_with_retry("delete", &self.policy, || self.backend.delete(index, id))
            .await
    }

    /// Execute a search. Single attempt: the query path degrades to the
    /// fallback store instead of retrying.
    pub async fn query(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError> {
        self.call_once("query", self.backend.query(index, request))
            .await
    }

    /// Create a new, empty index generation.
    pub async fn create_generation(&self, name: &str) -> Result<(), SearchIndexError> {
        self.call_with_retry("create_generation", &self.policy, || {
            self.backend.create_generation(name)
        })
        .await
    }

    /// Atomically repoint the alias, with a small bounded retry budget.
    ///
    /// The swap is always a single backend-side operation; a failure after
    /// the retries are exhausted surfaces as [`SearchIndexError::AliasSwap`]
    /// and leaves the previous generation live.
    pub async fn swap_alias(
        &self,
        alias: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), SearchIndexError> {
        let swap_policy = RetryPolicy {
            max_attempts: self.config.swap_attempts,
            ..self.policy.clone()
        };
        self.call_with_retry("swap_alias", &swap_policy, || {
            self.backend.swap_alias(alias, from, to)
        })
        .await
        .map_err(|e| match e {
            SearchIndexError::CircuitOpen(op) => SearchIndexError::CircuitOpen(op),
            other => SearchIndexError::alias_swap(format!(
                "{} -> {} failed: {}",
                from.unwrap_or("<none>"),
                to,
                other
            )),
        })
    }

    /// Delete an index generation, retrying transient failures.
    pub async fn delete_generation(&self, name: &str) -> Result<(), SearchIndexError> {
        self.call_with_retry("delete_generation", &self.policy, || {
            self.backend.delete_generation(name)
        })
        .await
    }

    /// Resolve the generation currently behind the alias.
    ///
    /// Queried fresh every time; the alias target is backend-owned state
    /// and never cached in-process.
    pub async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SearchIndexError> {
        self.call_once("resolve_alias", self.backend.resolve_alias(alias))
            .await
    }

    /// Ensure the alias exists, bootstrapping an empty first generation if
    /// it doesn't. Returns the generation the alias points at.
    pub async fn ensure_alias(&self, alias: &str) -> Result<String, SearchIndexError> {
        if let Some(generation) = self.resolve_alias(alias).await? {
            return Ok(generation);
        }

        let generation = format!("{}_{}", alias, chrono::Utc::now().timestamp_millis());
        debug!(alias, generation, "Alias missing, bootstrapping first generation");
        self.create_generation(&generation).await?;
        self.swap_alias(alias, None, &generation).await?;
        Ok(generation)
    }

    /// One breaker-guarded, timeout-bounded backend call.
    async fn call_once<T, Fut>(
        &self,
        operation: &'static str,
        fut: Fut,
    ) -> Result<T, SearchIndexError>
    where
        Fut: Future<Output = Result<T, SearchIndexError>>,
    {
        self.breaker.try_acquire(operation)?;

        let outcome = match timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SearchIndexError::timeout(operation)),
        };

        match &outcome {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        outcome
    }

    /// Retry loop over [`call_once`](Self::call_once).
    ///
    /// Only transient failures consume backoff budget. A circuit-open
    /// rejection is returned immediately so the retry budget isn't wasted
    /// while the backend is known-unhealthy.
    async fn call_with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        mut f: F,
    ) -> Result<T, SearchIndexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchIndexError>>,
    {
        let mut delays = policy.delays();
        let mut attempt: usize = 1;
        loop {
            match self.call_once(operation, f()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        debug!(
                            operation,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Transient backend failure, backing off"
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(operation, attempt, error = %e, "Retry budget exhausted");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}
