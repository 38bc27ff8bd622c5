//! CLI module
//!
//! Command-line interface and HTTP server for the orchestrator.
//!
//! # Commands
//!
//! - `serve` - Start HTTP server mode
//! - `run` - Run one crawl in-process and print its execution log

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, StoreKind};
pub use runner::{build_orchestrator, Runner};
pub use server::{router, serve};
