//! Request pacing for registry (RDAP) servers
//!
//! Each registry host gets its own schedule: requests to the same host are
//! spaced at least `1 / requests_per_second` apart, requests to different
//! hosts do not wait on each other. A throttled RDAP answer is folded into
//! "unregistered", so pacing keeps false positives down. Nothing here retries.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Per-host request pacer. A rate of 0 disables pacing.
#[derive(Debug)]
pub struct HostRateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let interval = (requests_per_second > 0).then(|| Duration::from_secs_f64(1.0 / requests_per_second as f64));
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next slot for `host` and wait until it starts.
    /// The lock is released before sleeping so other hosts are not held up.
    pub async fn acquire(&self, host: &str) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(host).copied().filter(|s| *s > now).unwrap_or(now);
            slots.insert(host.to_string(), slot + interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!("Pacing request to {} by {:?}", host, wait);
            sleep_until(slot).await;
        }
    }
}
