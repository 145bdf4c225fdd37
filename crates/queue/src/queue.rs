//! The durable entry list behind one retry queue.
//!
//! The in-memory `VecDeque` is authoritative while the loop runs; every
//! mutation rewrites the whole JSON list under `rqueue_<name>` before the
//! lock is released, so the stored list never lags a returned call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::entry::{QueueEntry, QueueParams};
use crate::error::QueueError;
use crate::store::KvStore;

/// Store key prefix for persisted queue lists.
pub const QUEUE_KEY_PREFIX: &str = "rqueue_";

/// Store key holding the entry list of queue `name`.
pub fn queue_key(name: &str) -> String {
    format!("{QUEUE_KEY_PREFIX}{name}")
}

/// Store key holding the run lease of queue `name`.
pub fn lease_key(name: &str) -> String {
    format!("{QUEUE_KEY_PREFIX}{name}:lease")
}

struct Inner<P> {
    name: String,
    key: String,
    store: Arc<dyn KvStore>,
    entries: Mutex<VecDeque<QueueEntry<P>>>,
    notify: Notify,
    /// Set when the owning loop stops; the in-memory list may then be stale.
    detached: AtomicBool,
}

/// Producer-side handle to a running retry queue.
///
/// Cloning is cheap; every clone appends to the same list and wakes the same
/// worker loop.
pub struct RetryQueue<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for RetryQueue<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for RetryQueue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryQueue")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl<P: QueueParams> RetryQueue<P> {
    /// Load the persisted list for `name`, or start empty.
    pub(crate) async fn load(name: &str, store: Arc<dyn KvStore>) -> Result<Self, QueueError> {
        let key = queue_key(name);
        let entries = match store.get(&key).await? {
            Some(raw) => serde_json::from_slice::<VecDeque<QueueEntry<P>>>(&raw)
                .map_err(|source| QueueError::Corrupt {
                    key: key.clone(),
                    source,
                })?,
            None => VecDeque::new(),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                key,
                store,
                entries: Mutex::new(entries),
                notify: Notify::new(),
                detached: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Append `params` at the tail and persist before returning.
    ///
    /// On a store failure the in-memory append is undone and the error is
    /// returned, so a caller never sees success for an entry that would be
    /// lost on restart. Fails with [`QueueError::LeaseLost`] once the loop
    /// owning this queue has stopped.
    pub async fn append(&self, params: P) -> Result<(), QueueError> {
        let mut entries = self.inner.entries.lock().await;
        entries.push_back(QueueEntry::new(params));
        if let Err(e) = self.persist(&entries).await {
            entries.pop_back();
            return Err(e);
        }
        let len = entries.len();
        drop(entries);

        tracing::debug!(queue = %self.inner.name, len, "Queue entry appended");
        self.inner.notify.notify_one();
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.lock().await.is_empty()
    }

    /// Copy of the current list, head first.
    pub async fn snapshot(&self) -> Vec<QueueEntry<P>> {
        self.inner.entries.lock().await.iter().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Consumer side (worker loop only)
    // ------------------------------------------------------------------

    /// Increment the head's retry counter, persist, and return a copy.
    pub(crate) async fn bump_head(&self) -> Result<Option<QueueEntry<P>>, QueueError> {
        let mut entries = self.inner.entries.lock().await;
        let Some(head) = entries.front_mut() else {
            return Ok(None);
        };
        head.retry_count = head.retry_count.saturating_add(1);
        let bumped = head.clone();
        self.persist(&entries).await?;
        Ok(Some(bumped))
    }

    /// Remove the head after a successful (or exhausted) attempt.
    pub(crate) async fn pop_head(&self) -> Result<(), QueueError> {
        let mut entries = self.inner.entries.lock().await;
        if entries.pop_front().is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    /// Move the head to the tail after a failed attempt.
    pub(crate) async fn rotate_head(&self) -> Result<(), QueueError> {
        let mut entries = self.inner.entries.lock().await;
        if let Some(head) = entries.pop_front() {
            entries.push_back(head);
            self.persist(&entries).await?;
        }
        Ok(())
    }

    /// Refuse every later write. Taking the list lock waits out an append
    /// already in progress.
    pub(crate) async fn detach(&self) {
        let _entries = self.inner.entries.lock().await;
        self.inner.detached.store(true, Ordering::SeqCst);
    }

    /// Resolves once an append happened since the last wakeup.
    pub(crate) async fn appended(&self) {
        self.inner.notify.notified().await;
    }

    async fn persist(&self, entries: &VecDeque<QueueEntry<P>>) -> Result<(), QueueError> {
        if self.inner.detached.load(Ordering::SeqCst) {
            return Err(QueueError::LeaseLost(self.inner.name.clone()));
        }
        let raw = serde_json::to_vec(entries).map_err(QueueError::Encode)?;
        self.inner.store.set(&self.inner.key, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;

    async fn stored(store: &MemoryKvStore, name: &str) -> Vec<QueueEntry<String>> {
        let raw = store.get(&queue_key(name)).await.unwrap().unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[tokio::test]
    async fn append_persists_full_list() {
        let store = Arc::new(MemoryKvStore::new());
        let queue = RetryQueue::<String>::load("q", store.clone()).await.unwrap();

        queue.append("a".into()).await.unwrap();
        queue.append("b".into()).await.unwrap();

        let persisted = stored(&store, "q").await;
        assert_eq!(
            persisted,
            vec![QueueEntry::new("a".to_string()), QueueEntry::new("b".to_string())]
        );
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn bump_rotate_pop_are_persisted() {
        let store = Arc::new(MemoryKvStore::new());
        let queue = RetryQueue::<String>::load("q", store.clone()).await.unwrap();
        queue.append("a".into()).await.unwrap();
        queue.append("b".into()).await.unwrap();

        let head = queue.bump_head().await.unwrap().unwrap();
        assert_eq!(head.params, "a");
        assert_eq!(head.retry_count, 1);
        assert_eq!(stored(&store, "q").await[0].retry_count, 1);

        queue.rotate_head().await.unwrap();
        let order: Vec<_> = stored(&store, "q").await.into_iter().map(|e| e.params).collect();
        assert_eq!(order, vec!["b", "a"]);

        queue.pop_head().await.unwrap();
        let left = stored(&store, "q").await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].params, "a");
        assert_eq!(left[0].retry_count, 1);
    }

    #[tokio::test]
    async fn load_restores_persisted_entries() {
        let store = Arc::new(MemoryKvStore::new());
        let raw = br#"[{"params":"x","retry_count":4},{"params":"y"}]"#;
        store.set(&queue_key("q"), raw).await.unwrap();

        let queue = RetryQueue::<String>::load("q", store).await.unwrap();
        let entries = queue.snapshot().await;
        assert_eq!(entries[0].retry_count, 4);
        assert_eq!(entries[1], QueueEntry::new("y".to_string()));
    }

    #[tokio::test]
    async fn corrupt_list_is_reported() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(&queue_key("q"), b"not json").await.unwrap();

        let err = RetryQueue::<String>::load("q", store).await.err().unwrap();
        assert!(matches!(err, QueueError::Corrupt { ref key, .. } if key == "rqueue_q"));
    }

    #[tokio::test]
    async fn detached_queue_refuses_writes() {
        let store = Arc::new(MemoryKvStore::new());
        let queue = RetryQueue::<String>::load("q", store.clone()).await.unwrap();
        queue.append("a".into()).await.unwrap();

        queue.detach().await;

        let err = queue.append("b".into()).await.unwrap_err();
        assert!(matches!(err, QueueError::LeaseLost(ref name) if name == "q"));
        assert_eq!(queue.len().await, 1);
        assert_eq!(stored(&store, "q").await.len(), 1);
    }

    #[test]
    fn key_layout() {
        assert_eq!(queue_key("train_audio"), "rqueue_train_audio");
        assert_eq!(lease_key("train_audio"), "rqueue_train_audio:lease");
    }
}
