//! Fixed-delay pacing for upstream requests

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One request per configured period; a zero delay disables pacing
#[derive(Clone)]
pub struct Pacer {
    limiter: Option<Arc<DirectLimiter>>,
    period: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        let limiter = Quota::with_period(delay)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(nonzero!(1u32)))));
        Self {
            limiter,
            period: delay,
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            trace!("Pacing request ({:?} period)", self.period);
            limiter.until_ready().await;
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").field("period", &self.period).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_pacer_spaces_requests() {
        let pacer = Pacer::from_millis(100);

        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;

        // first call is free, two more periods follow
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_wait() {
        let pacer = Pacer::from_millis(0);
        let start = Instant::now();
        for _ in 0..20 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
