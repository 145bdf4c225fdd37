//! Process-wide owner of the retry queues.
//!
//! Created once at startup with a single store handle. Each queue it creates
//! runs in a tracked tokio task; [`QueueManager::shutdown`] cancels all of
//! them and waits for their loops to release their leases.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::RetryQueueConfig;
use crate::error::QueueError;
use crate::handler::QueueHandler;
use crate::memory::MemoryKvStore;
use crate::queue::{lease_key, RetryQueue};
use crate::redis::RedisKvStore;
use crate::store::KvStore;
use crate::worker::{Lease, Worker};

/// URL selecting the in-process store instead of Redis.
pub const MEMORY_STORE_URL: &str = "memory://";

/// First pause while waiting for a foreign lease to expire; doubles up to the
/// queue's refresh interval.
const LEASE_WAIT_START: Duration = Duration::from_millis(50);

/// Reservation of a queue name inside one manager. Released on drop.
pub(crate) struct RunToken {
    name: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunToken {
    fn claim(active: &Arc<Mutex<HashSet<String>>>, name: &str) -> Result<Self, QueueError> {
        if !active.lock().insert(name.to_string()) {
            return Err(QueueError::AlreadyRunning(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            active: Arc::clone(active),
        })
    }
}

impl Drop for RunToken {
    fn drop(&mut self) {
        self.active.lock().remove(&self.name);
    }
}

pub struct QueueManager {
    store: Arc<dyn KvStore>,
    owner_id: String,
    active: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl QueueManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            owner_id: uuid::Uuid::new_v4().to_string(),
            active: Arc::new(Mutex::new(HashSet::new())),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Connect to the store at `url`: `memory://` for an in-process store,
    /// anything else is handed to the Redis client.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let store: Arc<dyn KvStore> = if url == MEMORY_STORE_URL {
            tracing::warn!("Using in-memory queue store; entries will not survive a restart");
            Arc::new(MemoryKvStore::new())
        } else {
            Arc::new(RedisKvStore::connect(url).await?)
        };
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Identifier written into the leases this manager holds.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Start the queue `name`, reloading any persisted entries.
    ///
    /// A lease held by another owner is waited on for up to
    /// `config.lease_ttl`, which covers the lease of a process that died
    /// without releasing it. Fails with [`QueueError::AlreadyRunning`] when
    /// this manager already runs `name` or another owner keeps refreshing
    /// its lease.
    pub async fn create<H: QueueHandler>(
        &self,
        name: &str,
        handler: H,
        config: RetryQueueConfig,
    ) -> Result<RetryQueue<H::Params>, QueueError> {
        let token = RunToken::claim(&self.active, name)?;

        let lease = Lease::new(
            Arc::clone(&self.store),
            lease_key(name),
            self.owner_id.clone(),
            config.lease_ttl,
        );
        self.acquire_lease(name, &lease, &config).await?;

        let queue = match RetryQueue::load(name, Arc::clone(&self.store)).await {
            Ok(queue) => queue,
            Err(e) => {
                lease.release().await;
                return Err(e);
            }
        };

        let pending = queue.len().await;
        tracing::info!(queue = %name, pending, "Retry queue created");

        let worker = Worker {
            queue: queue.clone(),
            handler: Arc::new(handler),
            config,
            lease,
            cancel: self.cancel.child_token(),
        };
        self.tracker.spawn(worker.run(token));

        Ok(queue)
    }

    async fn acquire_lease(
        &self,
        name: &str,
        lease: &Lease,
        config: &RetryQueueConfig,
    ) -> Result<(), QueueError> {
        let deadline = tokio::time::Instant::now() + config.lease_ttl;
        let mut backoff = LEASE_WAIT_START.min(config.lease_refresh_interval());

        loop {
            if lease.refresh().await? {
                return Ok(());
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(QueueError::AlreadyRunning(name.to_string()));
            }
            tracing::info!(
                queue = %name,
                wait_ms = backoff.as_millis() as u64,
                "Queue lease held by another owner, waiting for it to expire"
            );
            tokio::time::sleep(backoff.min(deadline - now)).await;
            backoff = (backoff * 2).min(config.lease_refresh_interval());
        }
    }

    /// Names of queues currently running in this manager.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.lock().iter().cloned().collect();
        names.sort();
        names
    }

    /// Cancel every queue loop and wait until all have stopped.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("All retry queues stopped");
    }
}
