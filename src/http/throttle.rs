//! Outbound request throttle
//!
//! A single governor token bucket paces every page fetch of the process, so
//! concurrent crawls share one request budget toward upstream APIs.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Request budget of the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Sustained fetches per second
    pub requests_per_second: u32,
    /// Fetches allowed back to back before pacing starts
    pub burst: u32,
}

impl ThrottleConfig {
    /// Budget whose burst equals the per-second rate
    pub fn per_second(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            burst: requests_per_second,
        }
    }

    /// Override the burst
    #[must_use]
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    fn quota(&self) -> Quota {
        // zero would disable the bucket; treat it as the slowest pace instead
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Shared pacing handle held by the HTTP client
#[derive(Clone)]
pub struct Throttle {
    bucket: Arc<DirectLimiter>,
}

impl Throttle {
    /// Build the bucket for `config`
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            bucket: Arc::new(RateLimiter::direct(config.quota())),
        }
    }

    /// Suspend until the next fetch fits the budget
    pub async fn until_ready(&self) {
        self.bucket.until_ready().await;
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").finish_non_exhaustive()
    }
}
