use async_trait::async_trait;

use crate::entry::QueueParams;

/// Error type handlers return to request a retry.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Processes entries of one retry queue.
///
/// Returning `Err` (or panicking) moves the entry to the tail for a later
/// attempt. A handler that decides an entry is beyond saving does its own
/// failure bookkeeping and returns `Ok(())` so the queue drops it.
#[async_trait]
pub trait QueueHandler: Send + Sync + 'static {
    type Params: QueueParams;

    /// `retry_count` is 1 on the first attempt.
    async fn handle(&self, params: &Self::Params, retry_count: u32) -> Result<(), HandlerError>;

    /// Called instead of [`handle`](Self::handle) when the queue-level
    /// `max_attempts` ceiling is exceeded; the entry is dropped afterwards.
    async fn on_exhausted(&self, _params: &Self::Params, retry_count: u32) {
        tracing::warn!(retry_count, "Queue entry exhausted its attempts, dropping");
    }
}
