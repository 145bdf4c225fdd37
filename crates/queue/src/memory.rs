//! In-process [`KvStore`] for tests and single-process development.
//!
//! Values and leases live in a `parking_lot` mutex; two [`QueueManager`]s
//! sharing one `Arc<MemoryKvStore>` behave like two processes sharing Redis.
//!
//! [`QueueManager`]: crate::manager::QueueManager

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::store::{KvError, KvStore};

#[derive(Default)]
struct Inner {
    values: HashMap<String, Vec<u8>>,
    leases: HashMap<String, (String, Instant)>,
}

#[derive(Default)]
pub struct MemoryKvStore {
    inner: Mutex<Inner>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lease holder of `key`, ignoring expired leases.
    pub fn lease_holder(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .leases
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(owner, _)| owner.clone())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.inner.lock().values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.inner
            .lock()
            .values
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.inner.lock().values.remove(key);
        Ok(())
    }

    async fn acquire_lease(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let free = match inner.leases.get(key) {
            None => true,
            Some((holder, expires)) => holder == owner || *expires <= now,
        };
        if free {
            inner
                .leases
                .insert(key.to_string(), (owner.to_string(), now + ttl));
        }
        Ok(free)
    }

    async fn release_lease(&self, key: &str, owner: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        if inner.leases.get(key).is_some_and(|(holder, _)| holder == owner) {
            inner.leases.remove(key);
        }
        Ok(())
    }
}
