//! Key-value store contract used by the retry queues.
//!
//! Queues keep their whole entry list under one key and rewrite it on every
//! mutation, so the store only needs whole-value reads and writes. The lease
//! operations back the per-queue run token that keeps a second process from
//! draining the same queue.

use std::time::Duration;

use async_trait::async_trait;

/// Errors from a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The backend could not be reached or rejected the command.
    #[error("Key-value backend error: {0}")]
    Backend(String),

    /// The connection URL is malformed or uses an unsupported scheme.
    #[error("Invalid key-value store URL: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Store `value` under `key` with no expiry, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Take or extend the lease on `key` for `owner`.
    ///
    /// Succeeds when the lease is free, expired, or already held by `owner`;
    /// the lease then expires `ttl` from now. Returns `false` when another
    /// owner holds a live lease.
    async fn acquire_lease(&self, key: &str, owner: &str, ttl: Duration)
        -> Result<bool, KvError>;

    /// Drop the lease on `key` if `owner` holds it.
    async fn release_lease(&self, key: &str, owner: &str) -> Result<(), KvError>;
}
