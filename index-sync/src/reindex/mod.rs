//! Full reindex orchestrator.
//!
//! Rebuilds the search index from the authoritative store into a fresh
//! generation, then atomically repoints the alias. Queries and the pipeline
//! keep using the alias throughout, so a reindex is invisible to them until
//! the swap, and a failed reindex leaves the live generation untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use index_sync_shared::{map_record, SearchDocument};
use index_sync_repository::{SearchIndexClient, SourceStore};

/// Configuration for the reindex orchestrator.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Number of records fetched and bulk-indexed per page.
    pub page_size: usize,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

/// Observable state of a reindex job.
#[derive(Debug, Clone, PartialEq)]
pub enum ReindexStatus {
    /// The job is paging records into the staging generation.
    Running {
        pages_done: u64,
        documents_indexed: u64,
    },
    /// The job finished and the alias now points at `generation`.
    Completed {
        documents_indexed: u64,
        generation: String,
    },
    /// The job failed before the swap; the previous generation is still
    /// live and the staging generation has been cleaned up.
    Failed {
        last_completed_page: u64,
        message: String,
    },
}

/// Handle to a running reindex job.
pub struct ReindexHandle {
    /// Identifier of this job, also the staging generation name.
    pub job_id: String,
    status_rx: watch::Receiver<ReindexStatus>,
    join: JoinHandle<()>,
}

impl ReindexHandle {
    /// Latest observed status.
    pub fn status(&self) -> ReindexStatus {
        self.status_rx.borrow().clone()
    }

    /// Wait for the job to finish and return its final status.
    pub async fn wait(self) -> ReindexStatus {
        let _ = self.join.await;
        self.status_rx.borrow().clone()
    }
}

/// Orchestrates paged rebuilds of the search index.
pub struct ReindexOrchestrator {
    client: Arc<SearchIndexClient>,
    store: Arc<dyn SourceStore>,
    alias: String,
    config: ReindexConfig,
}

impl ReindexOrchestrator {
    /// Create an orchestrator over the given client and store.
    pub fn new(
        client: Arc<SearchIndexClient>,
        store: Arc<dyn SourceStore>,
        alias: String,
        config: ReindexConfig,
    ) -> Self {
        Self {
            client,
            store,
            alias,
            config,
        }
    }

    /// Spawn a reindex job in the background.
    ///
    /// `running` is cleared when the job finishes, whatever the outcome, so
    /// the caller can reject concurrent reindex requests.
    pub fn spawn(&self, running: Arc<AtomicBool>) -> ReindexHandle {
        let generation = format!("{}_{}", self.alias, chrono::Utc::now().timestamp_millis());
        let (status_tx, status_rx) = watch::channel(ReindexStatus::Running {
            pages_done: 0,
            documents_indexed: 0,
        });

        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let alias = self.alias.clone();
        let config = self.config.clone();
        let job_id = generation.clone();

        let join = tokio::spawn(async move {
            let status =
                run_reindex(client, store, &alias, &generation, &config).await;
            match &status {
                ReindexStatus::Completed {
                    documents_indexed, ..
                } => {
                    info!(
                        generation = %generation,
                        documents_indexed,
                        "Reindex completed"
                    );
                }
                ReindexStatus::Failed {
                    last_completed_page,
                    message,
                } => {
                    error!(
                        generation = %generation,
                        last_completed_page,
                        message = %message,
                        "Reindex failed"
                    );
                }
                ReindexStatus::Running { .. } => {}
            }
            let _ = status_tx.send(status);
            running.store(false, Ordering::Release);
        });

        ReindexHandle {
            job_id,
            status_rx,
            join,
        }
    }
}

/// Execute one reindex run against a freshly named staging generation.
#[instrument(skip(client, store, config), fields(alias = %alias, generation = %generation))]
async fn run_reindex(
    client: Arc<SearchIndexClient>,
    store: Arc<dyn SourceStore>,
    alias: &str,
    generation: &str,
    config: &ReindexConfig,
) -> ReindexStatus {
    info!(page_size = config.page_size, "Starting reindex");

    if let Err(e) = client.create_generation(generation).await {
        return ReindexStatus::Failed {
            last_completed_page: 0,
            message: format!("Failed to create generation: {}", e),
        };
    }

    let mut after: Option<String> = None;
    let mut pages_done: u64 = 0;
    let mut documents_indexed: u64 = 0;

    loop {
        let page = match store.fetch_page(after.as_deref(), config.page_size).await {
            Ok(page) => page,
            Err(e) => {
                cleanup_staging(&client, generation).await;
                return ReindexStatus::Failed {
                    last_completed_page: pages_done,
                    message: format!("Failed to fetch page: {}", e),
                };
            }
        };

        if page.records.is_empty() {
            break;
        }

        let documents: Vec<SearchDocument> = page.records.iter().map(map_record).collect();
        match client.bulk_upsert(generation, &documents).await {
            Ok(summary) if summary.failed == 0 => {
                documents_indexed += summary.succeeded as u64;
            }
            Ok(summary) => {
                // A partially applied page would leave silent gaps in the
                // new generation; abort rather than swap to an incomplete
                // index.
                cleanup_staging(&client, generation).await;
                return ReindexStatus::Failed {
                    last_completed_page: pages_done,
                    message: format!(
                        "{} of {} documents rejected during bulk index",
                        summary.failed, summary.total
                    ),
                };
            }
            Err(e) => {
                cleanup_staging(&client, generation).await;
                return ReindexStatus::Failed {
                    last_completed_page: pages_done,
                    message: format!("Bulk index failed: {}", e),
                };
            }
        }

        after = page.records.last().map(|r| r.id.clone());
        pages_done += 1;
        info!(pages_done, documents_indexed, "Reindex progress");

        if !page.has_more {
            break;
        }
    }

    let previous = match client.resolve_alias(alias).await {
        Ok(previous) => previous,
        Err(e) => {
            cleanup_staging(&client, generation).await;
            return ReindexStatus::Failed {
                last_completed_page: pages_done,
                message: format!("Failed to resolve alias: {}", e),
            };
        }
    };

    if let Err(e) = client
        .swap_alias(alias, previous.as_deref(), generation)
        .await
    {
        cleanup_staging(&client, generation).await;
        return ReindexStatus::Failed {
            last_completed_page: pages_done,
            message: format!("Alias swap failed: {}", e),
        };
    }

    // Old generation cleanup is best effort: an orphaned index wastes disk
    // but serves no traffic, and the next reindex can remove it.
    if let Some(previous) = previous {
        if previous != generation {
            if let Err(e) = client.delete_generation(&previous).await {
                warn!(
                    generation = %previous,
                    error = %e,
                    "Failed to delete previous generation, leaving it orphaned"
                );
            }
        }
    }

    ReindexStatus::Completed {
        documents_indexed,
        generation: generation.to_string(),
    }
}

/// Best-effort removal of a staging generation after a failed run.
async fn cleanup_staging(client: &SearchIndexClient, generation: &str) {
    if let Err(e) = client.delete_generation(generation).await {
        warn!(
            generation = %generation,
            error = %e,
            "Failed to clean up staging generation"
        );
    }
}
