//! Execution log
//!
//! One parent record per crawl plus one immutable child record per recorded
//! page. The orchestrator is the only writer; everything else reads.
//!
//! # Overview
//!
//! - `ExecutionRequest` - what to crawl
//! - `ExecutionRecord` / `ChildExecutionRecord` - the log documents
//! - `ExecutionLogStore` - storage interface, with `MemoryLogStore` for a
//!   single process and the DuckDB store in [`crate::database`]

mod store;
mod types;

pub use store::{ExecutionLogStore, MemoryLogStore, SharedLogStore};
pub use types::{
    ChildExecutionRecord, ExecutionAck, ExecutionProgress, ExecutionRecord, ExecutionRequest,
    ExecutionStatus, UpstreamError, DEFAULT_MAX_ITERATIONS,
};
