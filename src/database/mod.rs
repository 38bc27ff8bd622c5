//! DuckDB persistence
//!
//! A single DuckDB database backs both the execution log and the item sink
//! when the `duckdb` storage backend is configured.

mod store;

pub use store::{validate_table_name, DuckDbStore, DEFAULT_EXECUTIONS_TABLE};
