//! Clients for the remote workers: the execution substrate that runs
//! inference pipelines, and the model-training services.

pub mod http;
pub mod memory;
pub mod training;

use std::sync::Arc;

use vox_core::substrate::ExecutionSubstrate;

pub use http::HttpSubstrate;
pub use memory::MemorySubstrate;
pub use training::{TrainingEndpoints, TrainingError, TrainingServices};

/// URL selecting the in-process substrate.
pub const MEMORY_SUBSTRATE_URL: &str = "memory://";

/// Build the substrate named by `url`: `memory://` gives a
/// [`MemorySubstrate`] whose stages succeed immediately, anything else an
/// [`HttpSubstrate`] rooted at `url`.
pub fn substrate_from_url(url: &str) -> Arc<dyn ExecutionSubstrate> {
    if url == MEMORY_SUBSTRATE_URL {
        tracing::warn!("Using in-memory execution substrate; stages complete without running");
        Arc::new(MemorySubstrate::completing())
    } else {
        Arc::new(HttpSubstrate::new(url))
    }
}
