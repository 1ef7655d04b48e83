//! Probe pacing.
//!
//! Token bucket limiting on top of `governor`, shared by every probe task of
//! one scan.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Caps how many probes start per second.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// Limit probes to `rate` per second; `0` means unlimited and yields
    /// `None`.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        let limiter = GovLimiter::direct(Quota::per_second(rate));

        Some(Self {
            limiter: Arc::new(limiter),
        })
    }

    /// Wait until the next probe may start.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[test]
    fn test_rate_limiter_creation() {
        assert!(RateLimiter::new(100).is_some());
    }

    #[tokio::test]
    async fn test_rate_limiter_wait() {
        let limiter = RateLimiter::new(1000).unwrap();
        limiter.wait().await;
    }

    #[tokio::test]
    async fn test_clones_share_one_bucket() {
        let limiter1 = RateLimiter::new(1).unwrap();
        let limiter2 = limiter1.clone();

        limiter1.wait().await;
        let second = tokio::time::timeout(Duration::from_millis(200), limiter2.wait()).await;
        assert!(second.is_err());
    }
}
