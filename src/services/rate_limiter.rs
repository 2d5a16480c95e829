use parking_lot::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Spaces out provider calls so consecutive probes are at least
/// `min_delay` apart. The first call never waits.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_delay,
        }
    }

    /// Wait until enough time has passed since the previous call.
    pub async fn acquire(&self) {
        let wait_time = {
            let last = self.last_request.lock();
            (*last).and_then(|at| self.min_delay.checked_sub(at.elapsed()))
        }; // Lock is dropped here

        if let Some(delay) = wait_time.filter(|d| !d.is_zero()) {
            sleep(delay).await;
        }

        *self.last_request.lock() = Some(Instant::now());
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}
