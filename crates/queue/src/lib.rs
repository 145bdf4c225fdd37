//! Durable per-name retry queues.
//!
//! Each queue keeps its full entry list in a shared key-value store (Redis in
//! production, [`MemoryKvStore`] in tests) and drains it sequentially: the
//! head's retry counter is bumped and persisted, the handler runs, and the
//! entry is either removed on success or rotated to the tail on failure.

pub mod config;
pub mod entry;
pub mod error;
pub mod handler;
pub mod manager;
pub mod memory;
pub mod queue;
pub mod redis;
pub mod store;
mod worker;

pub use config::RetryQueueConfig;
pub use entry::{QueueEntry, QueueParams};
pub use error::QueueError;
pub use handler::{HandlerError, QueueHandler};
pub use manager::{QueueManager, MEMORY_STORE_URL};
pub use memory::MemoryKvStore;
pub use queue::RetryQueue;
pub use store::{KvError, KvStore};
