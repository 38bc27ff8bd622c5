// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagewalk
//!
//! Fetches data from HTTP APIs whose pagination scheme is undeclared,
//! follows the pages until exhaustion or an iteration cap, and keeps an
//! auditable log of every page fetched.
//!
//! ## Features
//!
//! - **Pagination Detection**: Link header, offset, page number, cursor and bookmark styles
//! - **Background Crawls**: Immediate acknowledgment, cancelable detached tasks
//! - **Rate-Limit Retry**: Bounded, configurable backoff on 429 and "rate limit" bodies
//! - **Execution Log**: Parent/child records in memory or DuckDB
//! - **Item Sink**: Optional batched persistence of extracted items
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewalk::execution::{ExecutionRequest, MemoryLogStore};
//! use pagewalk::{HttpClient, Orchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pagewalk::Result<()> {
//!     let orchestrator = Orchestrator::new(HttpClient::new()?, Arc::new(MemoryLogStore::new()));
//!
//!     let request = ExecutionRequest::get("https://api.example.com/items")
//!         .query("limit", "50")
//!         .max_iterations(20);
//!     let ack = orchestrator.start(request).await?;
//!
//!     let status = orchestrator.wait(&ack.execution_id).await?;
//!     println!("{} finished: {status}", ack.execution_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                POST /execute/paginated  ·  pagewalk run         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                     Orchestrator + TaskRegistry
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   HTTP   │ Paginate  │    Extract    │   Sink    │  Exec Log   │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Fetch    │ Detect    │ Items         │ Batches   │ Parent      │
//! │ Throttle │ Resolve   │ Identifiers   │ Redaction │ Children    │
//! │ Retry    │ Merge     │               │ DuckDB    │ DuckDB      │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with throttling and rate-limit detection
pub mod http;

/// Pagination detection and next-page resolution
pub mod pagination;

/// Item and identifier extraction
pub mod extract;

/// Execution requests and the execution log
pub mod execution;

/// Item persistence
pub mod sink;

/// DuckDB-backed execution log and sink
pub mod database;

/// Crawl orchestration, task registry and events
pub mod engine;

/// Service configuration
pub mod config;

/// Command-line interface and HTTP server
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use engine::{ExecutionSettings, Orchestrator};
pub use execution::{ExecutionAck, ExecutionRequest, ExecutionStatus};
pub use http::HttpClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
