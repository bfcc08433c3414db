//! Dependency initialization and wiring for the synchronization engine.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use index_sync_repository::{
    CircuitBreaker, CircuitBreakerConfig, ClientConfig, MemoryStore, OpenSearchBackend,
    RetryPolicy, SearchIndexClient, SourceStore,
};

use crate::engine::SyncEngine;
use crate::errors::SyncError;
use crate::pipeline::{IndexingPipeline, PipelineConfig};
use crate::query::QueryFacade;
use crate::reindex::{ReindexConfig, ReindexOrchestrator};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index alias.
const DEFAULT_INDEX_ALIAS: &str = "records";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The assembled engine ready to serve traffic.
    pub engine: Arc<SyncEngine>,
    /// The alias the engine reads and writes through.
    pub alias: String,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_ALIAS`: Index alias name (default: "records")
    /// - `PIPELINE_QUEUE_CAPACITY`: Queue size (default: 1000)
    /// - `PIPELINE_MAX_BATCH_SIZE`: Batch size cap (default: 100)
    /// - `PIPELINE_FLUSH_INTERVAL_MS`: Batch latency cap (default: 200)
    /// - `PIPELINE_WORKER_COUNT`: Draining workers (default: 1)
    /// - `REINDEX_PAGE_SIZE`: Records per reindex page (default: 1000)
    pub async fn new() -> Result<Self, SyncError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let alias = env::var("INDEX_ALIAS").unwrap_or_else(|_| DEFAULT_INDEX_ALIAS.to_string());

        let pipeline_config = PipelineConfig {
            queue_capacity: env_usize("PIPELINE_QUEUE_CAPACITY", 1000),
            max_batch_size: env_usize("PIPELINE_MAX_BATCH_SIZE", 100),
            flush_interval: Duration::from_millis(env_u64("PIPELINE_FLUSH_INTERVAL_MS", 200)),
            worker_count: env_usize("PIPELINE_WORKER_COUNT", 1),
            ..PipelineConfig::default()
        };
        let reindex_config = ReindexConfig {
            page_size: env_usize("REINDEX_PAGE_SIZE", 1000),
        };

        info!(
            opensearch_url = %opensearch_url,
            alias = %alias,
            queue_capacity = pipeline_config.queue_capacity,
            max_batch_size = pipeline_config.max_batch_size,
            "Initializing dependencies"
        );

        let backend = OpenSearchBackend::new(&opensearch_url)
            .map_err(|e| SyncError::config(format!("Failed to create OpenSearch backend: {}", e)))?;
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
        let client = Arc::new(SearchIndexClient::with_config(
            Arc::new(backend),
            breaker,
            RetryPolicy::default(),
            ClientConfig::default(),
        ));

        // Bootstrap the alias so queries and the pipeline have a target
        // before the first reindex.
        let generation = client.ensure_alias(&alias).await?;
        info!(alias = %alias, generation = %generation, "Index alias ready");

        let store: Arc<dyn SourceStore> = Arc::new(MemoryStore::new());

        let pipeline = Arc::new(IndexingPipeline::new(
            Arc::clone(&client),
            alias.clone(),
            pipeline_config,
        ));
        let facade = QueryFacade::new(Arc::clone(&client), Arc::clone(&store), alias.clone());
        let reindexer = ReindexOrchestrator::new(
            Arc::clone(&client),
            Arc::clone(&store),
            alias.clone(),
            reindex_config,
        );

        let engine = Arc::new(SyncEngine::new(pipeline, facade, reindexer));

        Ok(Self { engine, alias })
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
