//! Error types for pagewalk
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for pagewalk
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error("Invalid execution request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Execution log store error: {message}")]
    LogStore { message: String },

    #[error("Item sink error for table '{table}': {message}")]
    Sink { table: String, message: String },

    // ============================================================================
    // Execution Errors
    // ============================================================================
    #[error("Execution '{id}' not found")]
    ExecutionNotFound { id: String },

    #[error("Execution cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a log store error
    pub fn log_store(message: impl Into<String>) -> Self {
        Self::LogStore {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for an execution id
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ExecutionNotFound { id: id.into() }
    }

    /// Stable machine-readable code for API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::InvalidConfigValue { .. } | Error::YamlParse(_) => {
                "CONFIG_ERROR"
            }
            Error::JsonParse(_) => "JSON_ERROR",
            Error::InvalidRequest { .. } | Error::InvalidUrl(_) => "INVALID_REQUEST",
            Error::Http(_) => "UPSTREAM_ERROR",
            Error::LogStore { .. } => "LOG_STORE_UNAVAILABLE",
            Error::Sink { .. } => "SINK_ERROR",
            Error::ExecutionNotFound { .. } => "NOT_FOUND",
            Error::Cancelled => "CANCELLED",
            Error::Io(_) => "IO_ERROR",
            Error::Other(_) | Error::Anyhow(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest { .. } | Error::InvalidUrl(_))
    }
}

/// Result type alias for pagewalk
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::log_store("connection refused");
        assert_eq!(
            err.to_string(),
            "Execution log store error: connection refused"
        );

        let err = Error::not_found("abc");
        assert_eq!(err.to_string(), "Execution 'abc' not found");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::log_store("x").code(), "LOG_STORE_UNAVAILABLE");
        assert_eq!(Error::invalid_request("x").code(), "INVALID_REQUEST");
        assert_eq!(Error::not_found("x").code(), "NOT_FOUND");
        assert_eq!(Error::Cancelled.code(), "CANCELLED");
        assert_eq!(Error::sink("t", "x").code(), "SINK_ERROR");
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::invalid_request("bad").is_client_error());
        assert!(!Error::log_store("down").is_client_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
