//! Index Sync Main Entry Point
//!
//! Runs the synchronization engine as a service: bootstraps the index
//! alias, starts the indexing pipeline and waits for shutdown.

use dotenv::dotenv;
use index_sync::{Dependencies, SyncError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("index_sync=info,index_sync_repository=info"));

    let json_format = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "index-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "index-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting index sync engine");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!(alias = %deps.alias, "Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    // Optionally rebuild the index on startup.
    let reindex_on_start = env::var("REINDEX_ON_START")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);
    if reindex_on_start {
        match deps.engine.trigger_reindex() {
            Ok(handle) => info!(job_id = %handle.job_id, "Startup reindex triggered"),
            Err(e) => error!(error = %e, "Failed to trigger startup reindex"),
        }
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| SyncError::config(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!("Received shutdown signal");
    deps.engine.shutdown().await;

    info!("Index sync engine stopped");
    Ok(())
}
