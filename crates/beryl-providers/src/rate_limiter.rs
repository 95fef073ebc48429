// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Per-provider request throttle.
///
/// Throttled services (MusicBrainz, Last.fm) must not see two requests
/// closer together than their declared interval. Each caller reserves the
/// next free time slot under a short lock and then sleeps until its slot
/// arrives, so concurrent passes against one throttled provider space out
/// in arrival order while other providers proceed untouched.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request may be made according to the declared interval.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = match *next {
                Some(reserved) => reserved.max(Instant::now()),
                None => Instant::now(),
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::trace!(target: "providers", "rate limiting: waiting {:?}", wait);
        }
        sleep_until(slot).await;
    }

    pub fn interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_is_immediate_then_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "got {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn concurrent_callers_space_out_in_arrival_order() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();

        for task in tasks {
            task.await.expect("task panicked");
        }

        // three slots reserved 50ms apart
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "got {:?}", elapsed);
    }
}
