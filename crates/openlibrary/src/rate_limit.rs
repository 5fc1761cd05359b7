//! Minimum spacing between outgoing requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Hands out permits no closer together than `min_interval`.
///
/// Callers are serialized on the internal lock, so a waiting caller holds
/// back everyone behind it.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
