//! Global request rate gate
//!
//! One gate is shared by all fetch workers: the time between the start of
//! any two attempts, across workers, is never less than the configured
//! minimum interval. The quota belongs to the remote service, so a
//! per-worker limit would not be enough.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Shared minimum-spacing gate for outbound requests.
pub struct RateGate {
    /// Next instant at which a request may start.
    next_allowed: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            next_allowed: Mutex::new(None),
            min_interval,
        }
    }

    /// Reserve the next request slot, sleeping until it is due.
    ///
    /// The slot is claimed under the lock and the wait happens outside it,
    /// so one worker's sleep never head-of-line blocks another worker.
    pub async fn acquire(&self) {
        let wait = {
            let mut next = self
                .next_allowed
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "Rate gate: waiting");
            tokio::time::sleep(wait).await;
        }
    }
}
