//! # Index Sync
//!
//! Search index synchronization engine - keeps an OpenSearch index in sync
//! with an authoritative record store, with asynchronous best-effort
//! indexing, atomic full rebuilds and a degraded query fallback.
//!
//! ## Architecture
//!
//! 1. **Pipeline**: Batches record changes into bulk index writes
//! 2. **Reindex**: Rebuilds the index into a fresh generation and swaps
//! 3. **Query**: Serves searches, degrading to the source store on failure
//! 4. **Engine**: Facade tying the three together for the host application
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`engine`]: The engine facade
//! - [`pipeline`]: Asynchronous indexing pipeline
//! - [`query`]: Query façade with degraded fallback
//! - [`reindex`]: Full reindex orchestrator
//! - [`errors`]: Error types for the engine

pub mod config;
pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod query;
pub mod reindex;

pub use config::Dependencies;
pub use engine::SyncEngine;
pub use errors::SyncError;
