//! The draining loop behind each retry queue.
//!
//! One tokio task per queue name. Within a queue at most one handler call is
//! in flight; the loop only ends on cancellation or when the store lease is
//! taken by someone else.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::config::RetryQueueConfig;
use crate::handler::QueueHandler;
use crate::manager::RunToken;
use crate::queue::RetryQueue;
use crate::store::{KvError, KvStore};

/// Store-level run lease for one queue name.
pub(crate) struct Lease {
    store: Arc<dyn KvStore>,
    key: String,
    owner: String,
    ttl: Duration,
}

impl Lease {
    pub(crate) fn new(store: Arc<dyn KvStore>, key: String, owner: String, ttl: Duration) -> Self {
        Self {
            store,
            key,
            owner,
            ttl,
        }
    }

    /// Take or extend the lease. `false` means another owner holds it.
    pub(crate) async fn refresh(&self) -> Result<bool, KvError> {
        self.store
            .acquire_lease(&self.key, &self.owner, self.ttl)
            .await
    }

    pub(crate) async fn release(&self) {
        if let Err(e) = self.store.release_lease(&self.key, &self.owner).await {
            tracing::warn!(lease = %self.key, error = %e, "Failed to release queue lease");
        }
    }
}

/// Outcome of one handler attempt.
enum Attempt {
    Succeeded,
    Failed(String),
    Cancelled,
    LeaseLost,
}

pub(crate) struct Worker<H: QueueHandler> {
    pub(crate) queue: RetryQueue<H::Params>,
    pub(crate) handler: Arc<H>,
    pub(crate) config: RetryQueueConfig,
    pub(crate) lease: Lease,
    pub(crate) cancel: CancellationToken,
}

impl<H: QueueHandler> Worker<H> {
    /// Run until cancelled or the lease is lost. `token` keeps the queue name
    /// reserved in the owning manager for the lifetime of the loop; once the
    /// loop ends the producer handle is detached and refuses appends.
    pub(crate) async fn run(self, token: RunToken) {
        let name = self.queue.name().to_string();
        tracing::info!(
            queue = %name,
            handle_interval_ms = self.config.handle_interval.as_millis() as u64,
            retry_interval_ms = self.config.retry_interval.as_millis() as u64,
            "Retry queue loop started",
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.lease.refresh().await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::error!(queue = %name, "Queue lease taken by another consumer, stopping");
                    break;
                }
                Err(e) => {
                    tracing::warn!(queue = %name, error = %e, "Queue lease refresh failed");
                    if !self.pause(self.config.retry_interval).await {
                        break;
                    }
                    continue;
                }
            }

            let entry = match self.queue.bump_head().await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    if !self.wait(self.config.idle_interval, true).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(queue = %name, error = %e, "Failed to persist retry count");
                    if !self.pause(self.config.retry_interval).await {
                        break;
                    }
                    continue;
                }
            };

            if let Some(max) = self.config.max_attempts {
                if entry.retry_count > max {
                    self.handler
                        .on_exhausted(&entry.params, entry.retry_count)
                        .await;
                    if let Err(e) = self.queue.pop_head().await {
                        tracing::error!(queue = %name, error = %e, "Failed to drop exhausted entry");
                    }
                    continue;
                }
            }

            match self.attempt(&entry.params, entry.retry_count).await {
                Attempt::Succeeded => {
                    tracing::debug!(queue = %name, retry_count = entry.retry_count, "Queue entry handled");
                    if let Err(e) = self.queue.pop_head().await {
                        tracing::error!(queue = %name, error = %e, "Failed to remove handled entry");
                    }
                    if !self.pause(self.config.handle_interval).await {
                        break;
                    }
                }
                Attempt::Failed(reason) => {
                    let delay = self.config.retry_delay(entry.retry_count);
                    tracing::error!(
                        queue = %name,
                        retry_count = entry.retry_count,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Queue handler failed, requeueing at tail",
                    );
                    if let Err(e) = self.queue.rotate_head().await {
                        tracing::error!(queue = %name, error = %e, "Failed to requeue entry");
                    }
                    if !self.pause(delay).await {
                        break;
                    }
                }
                Attempt::Cancelled | Attempt::LeaseLost => break,
            }
        }

        self.queue.detach().await;
        self.lease.release().await;
        drop(token);
        tracing::info!(queue = %name, "Retry queue loop stopped");
    }

    /// Run the handler once, catching panics and keeping the lease alive
    /// while it works.
    async fn attempt(&self, params: &H::Params, retry_count: u32) -> Attempt {
        let call = AssertUnwindSafe(self.handler.handle(params, retry_count)).catch_unwind();
        tokio::pin!(call);

        let mut refresh = self.refresh_ticker().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Attempt::Cancelled,
                outcome = &mut call => {
                    return match outcome {
                        Ok(Ok(())) => Attempt::Succeeded,
                        Ok(Err(e)) => Attempt::Failed(e.to_string()),
                        Err(panic) => Attempt::Failed(format!("handler panicked: {}", panic_message(&*panic))),
                    };
                }
                _ = refresh.tick() => {
                    if !self.keep_lease().await {
                        return Attempt::LeaseLost;
                    }
                }
            }
        }
    }

    /// Sleep for `duration`; `false` if cancelled or the lease was lost.
    async fn pause(&self, duration: Duration) -> bool {
        self.wait(duration, false).await
    }

    /// Sleep for `duration`, refreshing the lease on schedule. With
    /// `until_append` an append ends the wait early. `false` means the loop
    /// must stop.
    async fn wait(&self, duration: Duration, until_append: bool) -> bool {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        let mut refresh = self.refresh_ticker().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                _ = self.queue.appended(), if until_append => return true,
                _ = refresh.tick() => {
                    if !self.keep_lease().await {
                        return false;
                    }
                }
            }
        }
    }

    /// Interval whose first tick is already consumed.
    async fn refresh_ticker(&self) -> tokio::time::Interval {
        let mut refresh = tokio::time::interval(self.config.lease_refresh_interval());
        refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        refresh.tick().await;
        refresh
    }

    /// Extend the lease. `false` only when another owner holds it; a store
    /// error keeps the loop alive until the next refresh.
    async fn keep_lease(&self) -> bool {
        match self.lease.refresh().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(queue = %self.queue.name(), "Queue lease taken by another consumer, stopping");
                false
            }
            Err(e) => {
                tracing::warn!(queue = %self.queue.name(), error = %e, "Queue lease refresh failed");
                true
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
