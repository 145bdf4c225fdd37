use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bounds every queue payload must satisfy: serialisable for the durable
/// list, cloneable for snapshots, and shareable with the worker task.
pub trait QueueParams: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> QueueParams for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// One durable unit of work.
///
/// `retry_count` is bumped and persisted before every handler invocation, so
/// after a crash the reloaded value counts the interrupted attempt too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry<P> {
    pub params: P,
    #[serde(default)]
    pub retry_count: u32,
}

impl<P> QueueEntry<P> {
    pub fn new(params: P) -> Self {
        Self {
            params,
            retry_count: 0,
        }
    }
}
