//! Execution engine module
//!
//! Drives paginated crawls in the background.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Orchestrator` - starts crawls and runs the fetch/detect/extract/advance loop
//! - `TaskRegistry` - lifecycle and cancellation of background crawls
//! - `CrawlEvent` / `EventSink` - structured reporting of what a crawl did
//! - `ExecutionSettings` - retry policy, extraction and batching settings

mod events;
mod orchestrator;
mod registry;
mod types;

pub use events::{ChannelEventSink, CrawlEvent, EventSink, TracingEventSink};
pub use orchestrator::Orchestrator;
pub use registry::{TaskRegistry, TaskSnapshot, TaskState};
pub use types::{ExecutionSettings, DEFAULT_FINISHED_TASK_LIMIT};
