//! Spacing between consecutive marketplace requests.

use crate::config::MarketplaceConfig;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait Throttle: Send + Sync {
    /// Suspends until the next request may be sent.
    async fn wait(&self);
}

/// Waits a uniformly random time between `min` and `max`.
#[derive(Debug, Clone, Copy)]
pub struct JitterThrottle {
    min: Duration,
    max: Duration,
}

impl JitterThrottle {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    #[must_use]
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}

#[async_trait]
impl Throttle for JitterThrottle {
    async fn wait(&self) {
        let delay = self.next_delay();
        debug!(delay_ms = delay.as_millis(), "Throttling before next request");
        tokio::time::sleep(delay).await;
    }
}

/// Never waits. Used in tests and one-off tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThrottle;

#[async_trait]
impl Throttle for NoThrottle {
    async fn wait(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_bounds() {
        let throttle = JitterThrottle::new(Duration::from_millis(1000), Duration::from_millis(3000));
        for _ in 0..100 {
            let delay = throttle.next_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn inverted_bounds_collapse_to_min() {
        let throttle = JitterThrottle::new(Duration::from_millis(500), Duration::from_millis(10));
        assert_eq!(throttle.next_delay(), Duration::from_millis(500));
    }
}
