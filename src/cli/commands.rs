//! CLI commands and argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Paginated fetch orchestrator
#[derive(Parser, Debug)]
#[command(name = "pagewalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides `server.port`)
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage backend (overrides `storage.backend`)
        #[arg(long)]
        store: Option<StoreKind>,

        /// DuckDB database file, used with `--store duckdb`
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Run one crawl in-process and print its execution log
    Run {
        /// First page URL
        #[arg(long)]
        url: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Page cap (defaults to `execution.default_max_iterations`)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Query parameter, repeatable
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Request header, repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_key_value)]
        header: Vec<(String, String)>,

        /// Sink table for extracted items
        #[arg(long)]
        table: Option<String>,

        /// Save extracted items to `--table`
        #[arg(long, requires = "table")]
        save: bool,
    },
}

/// Storage backend selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// In-process memory
    Memory,
    /// DuckDB file
    Duckdb,
}

/// Parse `key=value`
pub(crate) fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
