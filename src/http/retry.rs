//! Rate-limit retry policy
//!
//! A throttled page is retried against the same URL after a delay. The number
//! of consecutive retries for one page is bounded unless `max_retries` is `None`.

use crate::types::{BackoffType, JsonValue};
use std::time::Duration;

const RATE_LIMIT_MARKER: &str = "rate limit";

/// Retry behavior for rate-limited page fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base delay before retrying
    pub delay: Duration,
    /// How the delay grows with consecutive attempts
    pub backoff: BackoffType,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Consecutive retries allowed for one page (`None` = unbounded)
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            backoff: BackoffType::Constant,
            max_delay: Duration::from_secs(60),
            max_retries: Some(10),
        }
    }
}

impl RetryPolicy {
    /// Constant delay with the given retry ceiling
    pub fn constant(delay: Duration, max_retries: Option<u32>) -> Self {
        Self {
            delay,
            backoff: BackoffType::Constant,
            max_delay: delay,
            max_retries,
        }
    }

    /// Calculate backoff delay for a given attempt (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.delay,
            BackoffType::Linear => self.delay.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.delay.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_delay)
    }

    /// Delay before retry `attempt`, or `None` once the ceiling is reached
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_retries {
            Some(max) if attempt >= max => None,
            _ => Some(self.calculate_backoff(attempt)),
        }
    }
}

/// Whether an error response signals throttling
///
/// True for status 429, or when the body's `errors` field is a string
/// containing "rate limit" or a list with an entry containing it.
pub fn is_rate_limited(status: u16, body: &JsonValue) -> bool {
    if status == 429 {
        return true;
    }

    match body.get("errors") {
        Some(JsonValue::String(message)) => mentions_rate_limit(message),
        Some(JsonValue::Array(entries)) => entries.iter().any(|entry| match entry {
            JsonValue::String(message) => mentions_rate_limit(message),
            other => mentions_rate_limit(&other.to_string()),
        }),
        Some(JsonValue::Null) | None => false,
        Some(other) => mentions_rate_limit(&other.to_string()),
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().contains(RATE_LIMIT_MARKER)
}
