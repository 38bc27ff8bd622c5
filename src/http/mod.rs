//! HTTP module
//!
//! Provides the page-fetching client adapter, the outbound throttle and the
//! rate-limit retry policy used by the orchestrator.
//!
//! # Features
//!
//! - **Uniform responses**: status, headers and body for every status code
//! - **Throttling**: Process-wide token bucket using governor
//! - **Retry Policy**: Rate-limit detection with constant, linear or exponential backoff

mod client;
mod retry;
mod throttle;

pub use client::{HttpClient, HttpClientConfig, HttpResponse, PageRequest};
pub use retry::{is_rate_limited, RetryPolicy};
pub use throttle::{Throttle, ThrottleConfig};

#[cfg(test)]
mod tests;
