//! Synchronization engine facade.
//!
//! Single entry point the host application talks to: change notifications
//! from the write path, searches from the read path, and reindex triggers
//! from operators. Wiring of the underlying components happens in
//! [`config`](crate::config).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use index_sync_shared::{map_record, ChangeKind, SearchRequest, SearchResponse, SourceRecord};

use crate::errors::SyncError;
use crate::pipeline::{IndexingPipeline, PipelineMetrics, WriteIntent};
use crate::query::QueryFacade;
use crate::reindex::{ReindexHandle, ReindexOrchestrator};

/// The search index synchronization engine.
pub struct SyncEngine {
    pipeline: Arc<IndexingPipeline>,
    facade: QueryFacade,
    reindexer: ReindexOrchestrator,
    reindex_running: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Assemble the engine from its components.
    pub fn new(
        pipeline: Arc<IndexingPipeline>,
        facade: QueryFacade,
        reindexer: ReindexOrchestrator,
    ) -> Self {
        Self {
            pipeline,
            facade,
            reindexer,
            reindex_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Notify the engine that an authoritative record changed.
    ///
    /// Fire and forget: this enqueues the corresponding index mutation and
    /// returns without waiting for it to be applied. The caller's
    /// transaction must never hinge on the index write.
    pub async fn on_record_changed(&self, record: &SourceRecord, kind: ChangeKind) {
        let intent = match kind {
            ChangeKind::Deleted => WriteIntent::Delete {
                id: record.id.clone(),
            },
            ChangeKind::Created | ChangeKind::Updated => WriteIntent::Upsert(map_record(record)),
        };

        debug!(record_id = %record.id, kind = ?kind, "Record change received");
        self.pipeline.enqueue(intent).await;
    }

    /// Execute a search. Never fails; see [`QueryFacade::search`].
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        self.facade.search(request).await
    }

    /// Start a full reindex in the background.
    ///
    /// At most one reindex runs at a time; a second trigger while one is in
    /// flight returns [`SyncError::ReindexAlreadyRunning`].
    pub fn trigger_reindex(&self) -> Result<ReindexHandle, SyncError> {
        if self
            .reindex_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::ReindexAlreadyRunning);
        }

        let handle = self.reindexer.spawn(Arc::clone(&self.reindex_running));
        info!(job_id = %handle.job_id, "Reindex triggered");
        Ok(handle)
    }

    /// Snapshot of the pipeline counters.
    pub fn pipeline_metrics(&self) -> PipelineMetrics {
        self.pipeline.metrics()
    }

    /// Drain the pipeline and stop its workers.
    pub async fn shutdown(&self) {
        info!("Shutting down synchronization engine");
        self.pipeline.shutdown().await;
    }
}
