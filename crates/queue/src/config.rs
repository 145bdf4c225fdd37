use std::time::Duration;

/// Default pause after a successful handler run.
const DEFAULT_HANDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Default pause after a failed handler run.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// How often an empty queue re-checks its list when no append wakes it.
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound for the backed-off retry delay.
const DEFAULT_MAX_RETRY_INTERVAL: Duration = Duration::from_secs(3600);

/// Lifetime of the store-level run lease; refreshed at a third of this.
const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(30);

/// Timing and retry policy for one retry queue.
#[derive(Debug, Clone)]
pub struct RetryQueueConfig {
    pub handle_interval: Duration,
    pub retry_interval: Duration,
    pub idle_interval: Duration,
    /// Growth factor applied per prior attempt. `1.0` keeps the delay fixed.
    pub backoff_multiplier: f64,
    pub max_retry_interval: Duration,
    /// Queue-level attempt ceiling. `None` leaves terminal failure entirely
    /// to the handler.
    pub max_attempts: Option<u32>,
    pub lease_ttl: Duration,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            handle_interval: DEFAULT_HANDLE_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            backoff_multiplier: 1.0,
            max_retry_interval: DEFAULT_MAX_RETRY_INTERVAL,
            max_attempts: None,
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }
}

impl RetryQueueConfig {
    pub fn new(handle_interval: Duration, retry_interval: Duration) -> Self {
        Self {
            handle_interval,
            retry_interval,
            ..Self::default()
        }
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    pub fn with_backoff(mut self, multiplier: f64, max_retry_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_retry_interval = max_retry_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Delay before the next attempt after `retry_count` failed attempts.
    ///
    /// `retry_interval * multiplier^(retry_count - 1)`, capped at
    /// `max_retry_interval` (never below `retry_interval`).
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(64) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let cap = self.max_retry_interval.max(self.retry_interval);
        let secs = self.retry_interval.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= cap.as_secs_f64() {
            cap
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Interval between lease refreshes while the loop is alive.
    pub fn lease_refresh_interval(&self) -> Duration {
        (self.lease_ttl / 3).max(Duration::from_millis(10))
    }
}
