//! Asynchronous indexing pipeline.
//!
//! Decouples authoritative-store writes from index writes: the write path
//! enqueues a [`WriteIntent`] and returns immediately, and background
//! workers drain the queue into batched backend calls.
//!
//! Batches are cut when they reach the size cap or when the flush interval
//! since the first queued item elapses, whichever comes first. Within a
//! batch, intents for the same record id are collapsed last-write-wins
//! before submission.
//!
//! Failure handling is per item: when a bulk call partially fails, only the
//! failed items are re-enqueued, each with a bounded attempt budget. When
//! the queue is full the newest intent is dropped and counted, keeping the
//! write path non-blocking under index outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use index_sync_shared::SearchDocument;
use index_sync_repository::{SearchIndexClient, SearchIndexError};

/// A single index mutation awaiting application.
#[derive(Debug, Clone)]
pub enum WriteIntent {
    /// Index (or replace) the full document projection.
    Upsert(SearchDocument),
    /// Remove the document for the given record id.
    Delete { id: String },
}

impl WriteIntent {
    /// The record id this intent applies to.
    pub fn id(&self) -> &str {
        match self {
            WriteIntent::Upsert(doc) => &doc.id,
            WriteIntent::Delete { id } => id,
        }
    }
}

/// An intent plus how many times it has been attempted.
#[derive(Debug, Clone)]
struct QueuedIntent {
    intent: WriteIntent,
    attempts: u32,
}

/// What to do when the queue is full.
#[derive(Debug, Clone, Copy)]
pub enum OverflowPolicy {
    /// Drop the incoming intent and count it. The write path never blocks;
    /// a later reindex reconciles anything dropped.
    DropNewest,
    /// Apply backpressure, waiting up to the given duration for space.
    BlockWithTimeout(Duration),
}

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of queued intents.
    pub queue_capacity: usize,
    /// Maximum number of intents per submitted batch.
    pub max_batch_size: usize,
    /// Maximum time a queued intent waits before its batch is flushed.
    pub flush_interval: Duration,
    /// Number of draining workers. With one worker, intents for the same
    /// record id are applied in enqueue order across batches.
    pub worker_count: usize,
    /// Attempts per intent before it is dropped as failed.
    pub max_item_attempts: u32,
    /// Behavior when the queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            max_batch_size: 100,
            flush_interval: Duration::from_millis(200),
            worker_count: 1,
            max_item_attempts: 3,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Counters shared between the pipeline handle and its workers.
#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    indexed: AtomicU64,
    deleted: AtomicU64,
    dropped_overflow: AtomicU64,
    dropped_failed: AtomicU64,
}

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineMetrics {
    /// Intents accepted into the queue.
    pub enqueued: u64,
    /// Documents confirmed indexed by the backend.
    pub indexed: u64,
    /// Documents confirmed deleted.
    pub deleted: u64,
    /// Intents dropped because the queue was full.
    pub dropped_overflow: u64,
    /// Intents dropped after exhausting their attempt budget.
    pub dropped_failed: u64,
}

/// Background pipeline applying write intents to the search index.
pub struct IndexingPipeline {
    tx: mpsc::Sender<QueuedIntent>,
    shutdown_tx: broadcast::Sender<()>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    config: PipelineConfig,
}

impl IndexingPipeline {
    /// Create the pipeline and spawn its workers.
    ///
    /// All index writes go to `alias`, so a reindex swap takes effect for
    /// the pipeline on its next batch without coordination.
    pub fn new(client: Arc<SearchIndexClient>, alias: String, config: PipelineConfig) -> Self {
        let (tx, rx) = mpsc::channel::<QueuedIntent>(config.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        let counters = Arc::new(Counters::default());

        let receiver = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count.max(1) {
            let worker = Worker {
                id: worker_id,
                client: Arc::clone(&client),
                alias: alias.clone(),
                receiver: Arc::clone(&receiver),
                requeue_tx: tx.clone(),
                counters: Arc::clone(&counters),
                config: config.clone(),
            };
            let shutdown_rx = shutdown_tx.subscribe();
            workers.push(tokio::spawn(worker.run(shutdown_rx)));
        }

        info!(
            queue_capacity = config.queue_capacity,
            max_batch_size = config.max_batch_size,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            worker_count = config.worker_count.max(1),
            "Indexing pipeline started"
        );

        Self {
            tx,
            shutdown_tx,
            workers: std::sync::Mutex::new(workers),
            counters,
            config,
        }
    }

    /// Enqueue an intent. Fire-and-forget: failures are logged and counted,
    /// never surfaced to the write path.
    pub async fn enqueue(&self, intent: WriteIntent) {
        let queued = QueuedIntent { intent, attempts: 0 };
        match self.config.overflow {
            OverflowPolicy::DropNewest => match self.tx.try_send(queued) {
                Ok(()) => {
                    self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                }
                Err(mpsc::error::TrySendError::Full(rejected)) => {
                    self.counters.dropped_overflow.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        record_id = rejected.intent.id(),
                        "Indexing queue full, dropping intent"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(rejected)) => {
                    error!(
                        record_id = rejected.intent.id(),
                        "Indexing queue closed, dropping intent"
                    );
                }
            },
            OverflowPolicy::BlockWithTimeout(wait) => match self.tx.send_timeout(queued, wait).await {
                Ok(()) => {
                    self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.dropped_overflow.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Indexing queue backpressure timed out, dropping intent");
                }
            },
        }
    }

    /// Snapshot the pipeline counters.
    pub fn metrics(&self) -> PipelineMetrics {
        PipelineMetrics {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            indexed: self.counters.indexed.load(Ordering::Relaxed),
            deleted: self.counters.deleted.load(Ordering::Relaxed),
            dropped_overflow: self.counters.dropped_overflow.load(Ordering::Relaxed),
            dropped_failed: self.counters.dropped_failed.load(Ordering::Relaxed),
        }
    }

    /// Stop the workers, draining queued intents first.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self
                .workers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        let metrics = self.metrics();
        info!(
            enqueued = metrics.enqueued,
            indexed = metrics.indexed,
            deleted = metrics.deleted,
            dropped_overflow = metrics.dropped_overflow,
            dropped_failed = metrics.dropped_failed,
            "Indexing pipeline shutdown complete"
        );
    }
}

struct Worker {
    id: usize,
    client: Arc<SearchIndexClient>,
    alias: String,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedIntent>>>,
    requeue_tx: mpsc::Sender<QueuedIntent>,
    counters: Arc<Counters>,
    config: PipelineConfig,
}

impl Worker {
    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        debug!(worker_id = self.id, "Pipeline worker started");
        let mut draining = false;

        loop {
            let batch = self.next_batch(&mut shutdown, &mut draining).await;
            if batch.is_empty() {
                if draining {
                    break;
                }
                continue;
            }
            self.flush_batch(batch, draining).await;
        }

        debug!(worker_id = self.id, "Pipeline worker stopped");
    }

    /// Collect the next batch: wait for a first intent, then fill until the
    /// size cap or the flush deadline. In drain mode only immediately
    /// available intents are taken.
    async fn next_batch(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
        draining: &mut bool,
    ) -> Vec<QueuedIntent> {
        let mut rx = self.receiver.lock().await;
        let mut batch = Vec::new();

        if *draining {
            while batch.len() < self.config.max_batch_size {
                match rx.try_recv() {
                    Ok(queued) => batch.push(queued),
                    Err(_) => break,
                }
            }
            return batch;
        }

        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(queued) => batch.push(queued),
                None => {
                    *draining = true;
                    return batch;
                }
            },
            _ = shutdown.recv() => {
                *draining = true;
                while batch.len() < self.config.max_batch_size {
                    match rx.try_recv() {
                        Ok(queued) => batch.push(queued),
                        Err(_) => break,
                    }
                }
                return batch;
            }
        }

        // Deadline runs from the first queued item, bounding its latency.
        let deadline = Instant::now() + self.config.flush_interval;
        while batch.len() < self.config.max_batch_size {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(queued)) => batch.push(queued),
                Ok(None) => {
                    *draining = true;
                    break;
                }
                Err(_) => break,
            }
        }

        batch
    }

    /// Collapse and submit one batch. Must be called with the receiver lock
    /// released so enqueues are not blocked behind backend latency.
    async fn flush_batch(&self, batch: Vec<QueuedIntent>, draining: bool) {
        // Last write wins per record id; first-seen order is preserved so
        // unrelated records keep their relative order.
        let mut order: Vec<String> = Vec::with_capacity(batch.len());
        let mut latest: HashMap<String, QueuedIntent> = HashMap::with_capacity(batch.len());
        for queued in batch {
            let id = queued.intent.id().to_string();
            if !latest.contains_key(&id) {
                order.push(id.clone());
            }
            latest.insert(id, queued);
        }

        let mut upserts: Vec<QueuedIntent> = Vec::new();
        let mut deletes: Vec<QueuedIntent> = Vec::new();
        for id in &order {
            if let Some(queued) = latest.remove(id) {
                match queued.intent {
                    WriteIntent::Upsert(_) => upserts.push(queued),
                    WriteIntent::Delete { .. } => deletes.push(queued),
                }
            }
        }

        debug!(
            worker_id = self.id,
            upserts = upserts.len(),
            deletes = deletes.len(),
            "Flushing batch"
        );

        self.submit_upserts(upserts, draining).await;
        self.submit_deletes(deletes, draining).await;
    }

    async fn submit_upserts(&self, upserts: Vec<QueuedIntent>, draining: bool) {
        if upserts.is_empty() {
            return;
        }

        let documents: Vec<SearchDocument> = upserts
            .iter()
            .filter_map(|q| match &q.intent {
                WriteIntent::Upsert(doc) => Some(doc.clone()),
                WriteIntent::Delete { .. } => None,
            })
            .collect();

        match self.client.bulk_upsert(&self.alias, &documents).await {
            Ok(summary) => {
                self.counters
                    .indexed
                    .fetch_add(summary.succeeded as u64, Ordering::Relaxed);

                if summary.failed == 0 {
                    return;
                }

                let mut by_id: HashMap<&str, &QueuedIntent> =
                    upserts.iter().map(|q| (q.intent.id(), q)).collect();
                for failure in summary.failures() {
                    let transient = failure
                        .error
                        .as_ref()
                        .map(SearchIndexError::is_transient)
                        .unwrap_or(false);
                    if let Some(queued) = by_id.remove(failure.id.as_str()) {
                        self.retry_or_drop(queued.clone(), transient, draining, "bulk_upsert")
                            .await;
                    }
                }
            }
            Err(e) => {
                let transient =
                    e.is_transient() || matches!(e, SearchIndexError::CircuitOpen(_));
                warn!(
                    worker_id = self.id,
                    batch_size = upserts.len(),
                    error = %e,
                    "Bulk upsert failed"
                );
                for queued in upserts {
                    self.retry_or_drop(queued, transient, draining, "bulk_upsert")
                        .await;
                }
            }
        }
    }

    async fn submit_deletes(&self, deletes: Vec<QueuedIntent>, draining: bool) {
        for queued in deletes {
            let id = queued.intent.id().to_string();
            match self.client.delete(&self.alias, &id).await {
                Ok(()) => {
                    self.counters.deleted.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    let transient =
                        e.is_transient() || matches!(e, SearchIndexError::CircuitOpen(_));
                    warn!(worker_id = self.id, record_id = %id, error = %e, "Delete failed");
                    self.retry_or_drop(queued, transient, draining, "delete").await;
                }
            }
        }
    }

    /// Re-enqueue a failed intent if it still has attempt budget and the
    /// failure can plausibly clear, otherwise drop it with a counter.
    async fn retry_or_drop(
        &self,
        mut queued: QueuedIntent,
        transient: bool,
        draining: bool,
        operation: &'static str,
    ) {
        queued.attempts += 1;

        // During drain there is no later batch to pick the retry up.
        let retriable =
            transient && !draining && queued.attempts < self.config.max_item_attempts;

        if retriable && self.requeue_tx.try_send(queued.clone()).is_ok() {
            debug!(
                record_id = queued.intent.id(),
                attempts = queued.attempts,
                operation,
                "Re-enqueued failed intent"
            );
            return;
        }

        self.counters.dropped_failed.fetch_add(1, Ordering::Relaxed);
        error!(
            record_id = queued.intent.id(),
            attempts = queued.attempts,
            operation,
            "Dropping intent after failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_sync_shared::FieldValue;

    fn doc(id: &str, name: &str) -> SearchDocument {
        SearchDocument::new(id).with_field("full_name", FieldValue::Text(name.to_string()))
    }

    #[test]
    fn test_write_intent_id() {
        assert_eq!(WriteIntent::Upsert(doc("r1", "Ada")).id(), "r1");
        assert_eq!(
            WriteIntent::Delete {
                id: "r2".to_string()
            }
            .id(),
            "r2"
        );
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.worker_count, 1);
        assert!(matches!(config.overflow, OverflowPolicy::DropNewest));
    }
}
