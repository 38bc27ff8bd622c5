//! Engine types
//!
//! Settings shared by every crawl an orchestrator runs.

use crate::execution::DEFAULT_MAX_ITERATIONS;
use crate::extract::ItemExtractor;
use crate::http::RetryPolicy;
use crate::sink::DEFAULT_BATCH_SIZE;

/// Finished tasks an orchestrator keeps for inspection
pub const DEFAULT_FINISHED_TASK_LIMIT: usize = 1000;

/// Per-process crawl settings
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Iteration cap for requests that do not set one
    pub default_max_iterations: u32,
    /// Rate-limit retry policy
    pub retry: RetryPolicy,
    /// Item and identifier extraction
    pub extractor: ItemExtractor,
    /// Concurrent saves per batch
    pub item_batch_size: usize,
    /// Finished tasks kept in the registry
    pub finished_task_limit: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            default_max_iterations: DEFAULT_MAX_ITERATIONS,
            retry: RetryPolicy::default(),
            extractor: ItemExtractor::default(),
            item_batch_size: DEFAULT_BATCH_SIZE,
            finished_task_limit: DEFAULT_FINISHED_TASK_LIMIT,
        }
    }
}

impl ExecutionSettings {
    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the default iteration cap
    #[must_use]
    pub fn with_default_max_iterations(mut self, max: u32) -> Self {
        self.default_max_iterations = max.max(1);
        self
    }

    /// Set the item extractor
    #[must_use]
    pub fn with_extractor(mut self, extractor: ItemExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn with_item_batch_size(mut self, size: usize) -> Self {
        self.item_batch_size = size.max(1);
        self
    }

    /// Set how many finished tasks stay in the registry (at least 1)
    #[must_use]
    pub fn with_finished_task_limit(mut self, limit: usize) -> Self {
        self.finished_task_limit = limit.max(1);
        self
    }
}
