use std::sync::Arc;

use vox_core::registry::ModelRegistry;
use vox_core::storage::BlobStore;
use vox_core::substrate::ExecutionSubstrate;

use crate::background::training::TrainingQueues;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vox_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Where inference pipelines are submitted and polled.
    pub substrate: Arc<dyn ExecutionSubstrate>,
    /// Voice model lookup for the composer.
    pub registry: Arc<dyn ModelRegistry>,
    /// Uploaded and generated files.
    pub blobs: Arc<dyn BlobStore>,
    /// Producer ends of the training retry queues.
    pub training: TrainingQueues,
}
