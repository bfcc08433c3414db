//! Integration tests for the synchronization engine write and read paths.
//!
//! These tests use the real pipeline, client and query façade, with a mock
//! search backend and an in-memory source store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};

use index_sync::engine::SyncEngine;
use index_sync::pipeline::{IndexingPipeline, PipelineConfig};
use index_sync::query::QueryFacade;
use index_sync::reindex::{ReindexConfig, ReindexOrchestrator};
use index_sync_repository::{
    BulkSummary, CircuitBreaker, ClientConfig, MemoryStore, RetryPolicy, SearchIndexBackend,
    SearchIndexClient, SearchIndexError, SourceStore,
};
use index_sync_shared::{
    ChangeKind, FieldValue, SearchDocument, SearchRequest, SearchResponse, SourceRecord,
};

/// Mock backend recording every write it receives.
struct RecordingBackend {
    bulk_calls: Mutex<Vec<(String, Vec<SearchDocument>)>>,
    deleted_ids: Mutex<Vec<String>>,
    fail_queries: AtomicBool,
}

impl RecordingBackend {
    fn new() -> Self {
        Self {
            bulk_calls: Mutex::new(Vec::new()),
            deleted_ids: Mutex::new(Vec::new()),
            fail_queries: AtomicBool::new(false),
        }
    }

    fn bulk_calls(&self) -> Vec<(String, Vec<SearchDocument>)> {
        self.bulk_calls.lock().unwrap().clone()
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted_ids.lock().unwrap().clone()
    }

    fn upserted_docs(&self) -> Vec<SearchDocument> {
        self.bulk_calls()
            .into_iter()
            .flat_map(|(_, docs)| docs)
            .collect()
    }
}

#[async_trait::async_trait]
impl SearchIndexBackend for RecordingBackend {
    async fn upsert_one(
        &self,
        index: &str,
        document: &SearchDocument,
    ) -> Result<(), SearchIndexError> {
        self.bulk_calls
            .lock()
            .unwrap()
            .push((index.to_string(), vec![document.clone()]));
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<BulkSummary, SearchIndexError> {
        self.bulk_calls
            .lock()
            .unwrap()
            .push((index.to_string(), documents.to_vec()));
        Ok(BulkSummary::all_ok(documents.iter().map(|d| d.id.clone())))
    }

    async fn delete(&self, _index: &str, id: &str) -> Result<(), SearchIndexError> {
        self.deleted_ids.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn query(
        &self,
        _index: &str,
        _request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(SearchIndexError::connection("backend down"));
        }
        Ok(SearchResponse::empty())
    }

    async fn create_generation(&self, _name: &str) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn swap_alias(
        &self,
        _alias: &str,
        _from: Option<&str>,
        _to: &str,
    ) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn delete_generation(&self, _name: &str) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn resolve_alias(&self, _alias: &str) -> Result<Option<String>, SearchIndexError> {
        Ok(Some("records_0".to_string()))
    }
}

fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        queue_capacity: 100,
        max_batch_size: 50,
        flush_interval: Duration::from_millis(50),
        worker_count: 1,
        ..PipelineConfig::default()
    }
}

fn build_engine(
    backend: Arc<RecordingBackend>,
    store: Arc<MemoryStore>,
    pipeline_config: PipelineConfig,
) -> SyncEngine {
    let client = Arc::new(SearchIndexClient::with_config(
        backend,
        Arc::new(CircuitBreaker::with_defaults()),
        RetryPolicy::no_retries(),
        ClientConfig::default(),
    ));
    let store: Arc<dyn SourceStore> = store;

    let pipeline = Arc::new(IndexingPipeline::new(
        Arc::clone(&client),
        "records".to_string(),
        pipeline_config,
    ));
    let facade = QueryFacade::new(Arc::clone(&client), Arc::clone(&store), "records".to_string());
    let reindexer = ReindexOrchestrator::new(
        client,
        store,
        "records".to_string(),
        ReindexConfig::default(),
    );

    SyncEngine::new(pipeline, facade, reindexer)
}

fn record(id: &str, first: &str) -> SourceRecord {
    SourceRecord::new(id).with_name(first, "Tester")
}

fn text_field(doc: &SearchDocument, name: &str) -> Option<String> {
    match doc.field(name) {
        Some(FieldValue::Text(value)) => Some(value.clone()),
        _ => None,
    }
}

#[tokio::test]
async fn test_rapid_updates_collapse_to_latest() {
    let backend = Arc::new(RecordingBackend::new());
    let engine = build_engine(
        Arc::clone(&backend),
        Arc::new(MemoryStore::new()),
        test_pipeline_config(),
    );

    // Two updates for the same record inside one flush window.
    engine
        .on_record_changed(&record("r1", "First"), ChangeKind::Created)
        .await;
    engine
        .on_record_changed(&record("r1", "Second"), ChangeKind::Updated)
        .await;

    timeout(Duration::from_secs(5), async {
        while backend.upserted_docs().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline should flush within the timeout");

    engine.shutdown().await;

    // Collapsed to a single document carrying the latest state.
    let docs = backend.upserted_docs();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "r1");
    assert_eq!(
        text_field(&docs[0], "full_name"),
        Some("Second Tester".to_string())
    );
}

#[tokio::test]
async fn test_upsert_then_delete_yields_only_delete() {
    let backend = Arc::new(RecordingBackend::new());
    let engine = build_engine(
        Arc::clone(&backend),
        Arc::new(MemoryStore::new()),
        test_pipeline_config(),
    );

    let r1 = record("r1", "Ada");
    engine.on_record_changed(&r1, ChangeKind::Created).await;
    engine.on_record_changed(&r1, ChangeKind::Deleted).await;

    timeout(Duration::from_secs(5), async {
        while backend.deleted_ids().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline should flush within the timeout");

    engine.shutdown().await;

    assert!(backend.upserted_docs().iter().all(|d| d.id != "r1"));
    assert_eq!(backend.deleted_ids(), vec!["r1".to_string()]);
}

#[tokio::test]
async fn test_repeated_upsert_is_idempotent() {
    let backend = Arc::new(RecordingBackend::new());
    let engine = build_engine(
        Arc::clone(&backend),
        Arc::new(MemoryStore::new()),
        test_pipeline_config(),
    );

    let r1 = record("r1", "Ada");
    engine.on_record_changed(&r1, ChangeKind::Created).await;

    timeout(Duration::from_secs(5), async {
        while backend.upserted_docs().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first flush");

    // Re-deliver the identical change in a later batch.
    engine.on_record_changed(&r1, ChangeKind::Updated).await;

    timeout(Duration::from_secs(5), async {
        while backend.upserted_docs().len() < 2 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("second flush");

    engine.shutdown().await;

    // Same record id, same projected document both times.
    let docs = backend.upserted_docs();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0], docs[1]);
}

#[tokio::test]
async fn test_search_degrades_to_source_store() {
    let backend = Arc::new(RecordingBackend::new());
    backend.fail_queries.store(true, Ordering::SeqCst);

    let store = Arc::new(
        MemoryStore::with_records(vec![
            record("r1", "Ada").with_email("ada@example.com"),
            record("r2", "Grace"),
        ])
        .await,
    );
    let engine = build_engine(Arc::clone(&backend), store, test_pipeline_config());

    let response = engine.search(&SearchRequest::new("ada")).await;

    assert!(response.degraded);
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].id, "r1");
    assert_eq!(response.results[0].relevance_score, 0.0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_invalid_query_returns_empty_response() {
    let backend = Arc::new(RecordingBackend::new());
    let engine = build_engine(
        Arc::clone(&backend),
        Arc::new(MemoryStore::new()),
        test_pipeline_config(),
    );

    let response = engine.search(&SearchRequest::new("  ")).await;
    assert!(response.is_empty());
    assert!(!response.degraded);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_backpressure_enqueue_counts_accepted_intents() {
    use index_sync::pipeline::{OverflowPolicy, WriteIntent};
    use index_sync_shared::map_record;

    let client = Arc::new(SearchIndexClient::with_config(
        Arc::new(RecordingBackend::new()),
        Arc::new(CircuitBreaker::with_defaults()),
        RetryPolicy::no_retries(),
        ClientConfig::default(),
    ));
    let pipeline = IndexingPipeline::new(
        client,
        "records".to_string(),
        PipelineConfig {
            overflow: OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)),
            ..test_pipeline_config()
        },
    );

    pipeline
        .enqueue(WriteIntent::Upsert(map_record(&record("r1", "Ada"))))
        .await;
    pipeline
        .enqueue(WriteIntent::Delete {
            id: "r2".to_string(),
        })
        .await;

    let metrics = pipeline.metrics();
    assert_eq!(metrics.enqueued, 2);
    assert_eq!(metrics.dropped_overflow, 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_queue_overflow_drops_newest_and_counts() {
    // Backend slow enough that the single worker stays busy while the
    // writer floods the one-slot queue.
    struct SlowBackend(RecordingBackend);

    #[async_trait::async_trait]
    impl SearchIndexBackend for SlowBackend {
        async fn upsert_one(
            &self,
            index: &str,
            document: &SearchDocument,
        ) -> Result<(), SearchIndexError> {
            self.0.upsert_one(index, document).await
        }

        async fn bulk_upsert(
            &self,
            index: &str,
            documents: &[SearchDocument],
        ) -> Result<BulkSummary, SearchIndexError> {
            sleep(Duration::from_millis(300)).await;
            self.0.bulk_upsert(index, documents).await
        }

        async fn delete(&self, index: &str, id: &str) -> Result<(), SearchIndexError> {
            self.0.delete(index, id).await
        }

        async fn query(
            &self,
            index: &str,
            request: &SearchRequest,
        ) -> Result<SearchResponse, SearchIndexError> {
            self.0.query(index, request).await
        }

        async fn create_generation(&self, name: &str) -> Result<(), SearchIndexError> {
            self.0.create_generation(name).await
        }

        async fn swap_alias(
            &self,
            alias: &str,
            from: Option<&str>,
            to: &str,
        ) -> Result<(), SearchIndexError> {
            self.0.swap_alias(alias, from, to).await
        }

        async fn delete_generation(&self, name: &str) -> Result<(), SearchIndexError> {
            self.0.delete_generation(name).await
        }

        async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SearchIndexError> {
            self.0.resolve_alias(alias).await
        }
    }

    let client = Arc::new(SearchIndexClient::with_config(
        Arc::new(SlowBackend(RecordingBackend::new())),
        Arc::new(CircuitBreaker::with_defaults()),
        RetryPolicy::no_retries(),
        ClientConfig::default(),
    ));
    let pipeline = IndexingPipeline::new(
        client,
        "records".to_string(),
        PipelineConfig {
            queue_capacity: 1,
            max_batch_size: 1,
            flush_interval: Duration::from_millis(10),
            worker_count: 1,
            ..PipelineConfig::default()
        },
    );

    use index_sync::pipeline::WriteIntent;
    use index_sync_shared::map_record;

    // First intent occupies the worker; give it time to get picked up.
    pipeline
        .enqueue(WriteIntent::Upsert(map_record(&record("r0", "Ada"))))
        .await;
    sleep(Duration::from_millis(50)).await;

    // Flood: one fits in the queue, the rest overflow.
    for i in 1..=5 {
        pipeline
            .enqueue(WriteIntent::Upsert(map_record(&record(
                &format!("r{}", i),
                "Ada",
            ))))
            .await;
    }

    let metrics = pipeline.metrics();
    assert!(
        metrics.dropped_overflow >= 1,
        "expected overflow drops, got {:?}",
        metrics
    );

    pipeline.shutdown().await;
}
