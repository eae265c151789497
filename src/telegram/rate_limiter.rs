//! Outbound message throttle.
//!
//! Keeps a minimum spacing between messages sent by the bot and honours
//! `FLOOD_WAIT` penalties reported by Telegram.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Rate limiter that enforces minimum intervals between sends.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed operations.
    min_interval: Duration,

    /// Earliest instant the next operation may run.
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// Waits until an operation is allowed, then reserves the next slot.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut next = self.next_allowed.lock().await;
        let now = Instant::now();

        let wait_duration = next.map_or(Duration::ZERO, |at| at.saturating_duration_since(now));

        if !wait_duration.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *next = Some(Instant::now() + self.min_interval);
        wait_duration
    }

    /// Blocks further operations for the flood wait reported by Telegram.
    ///
    /// Does not sleep itself; the next [`Self::wait_and_acquire`] does.
    pub async fn handle_flood_wait(&self, wait_seconds: u32) {
        warn!("Received flood wait from Telegram: {} seconds", wait_seconds);

        let until = Instant::now() + Duration::from_secs(u64::from(wait_seconds));
        let mut next = self.next_allowed.lock().await;
        if next.is_none_or(|at| at < until) {
            *next = Some(until);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_first_operation() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_operations() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.wait_and_acquire().await;
        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(limiter.wait_and_acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_extends_block() {
        let limiter = RateLimiter::new(Duration::from_millis(10));

        limiter.handle_flood_wait(3).await;

        let started = Instant::now();
        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::from_secs(3));
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_flood_wait_keeps_longer_block() {
        let limiter = RateLimiter::new(Duration::from_millis(10));

        limiter.handle_flood_wait(10).await;
        limiter.handle_flood_wait(2).await;

        assert_eq!(limiter.wait_and_acquire().await, Duration::from_secs(10));
    }
}
