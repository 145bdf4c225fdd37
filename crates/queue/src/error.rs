use crate::store::KvError;

/// Errors raised by queue creation and mutation.
///
/// Handler failures are not represented here: the worker loop absorbs them
/// and requeues the entry.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A live loop for this queue name already exists, in this process or in
    /// another one holding the store lease.
    #[error("Retry queue '{0}' is already running")]
    AlreadyRunning(String),

    /// The loop behind this queue stopped, so its list may no longer match
    /// the store; writes through the old handle are refused.
    #[error("Retry queue '{0}' no longer holds its store lease")]
    LeaseLost(String),

    #[error(transparent)]
    Store(#[from] KvError),

    /// The persisted list could not be decoded.
    #[error("Persisted queue list under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode queue list: {0}")]
    Encode(#[source] serde_json::Error),
}
