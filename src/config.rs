//! Service configuration
//!
//! Loaded from YAML. Every section has defaults so an empty file, or no file
//! at all, gives a working in-memory service on port 8080.

use crate::database::{validate_table_name, DuckDbStore, DEFAULT_EXECUTIONS_TABLE};
use crate::engine::{ExecutionSettings, DEFAULT_FINISHED_TASK_LIMIT};
use crate::error::{Error, Result, ResultExt};
use crate::execution::{MemoryLogStore, SharedLogStore, DEFAULT_MAX_ITERATIONS};
use crate::extract::{ItemExtractor, DEFAULT_ID_FIELDS};
use crate::http::{HttpClientConfig, RetryPolicy, ThrottleConfig};
use crate::sink::{MemorySink, SharedSink, DEFAULT_BATCH_SIZE};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Outbound HTTP settings
    pub http: HttpConfig,
    /// Crawl settings
    pub execution: ExecutionConfig,
    /// Execution log and sink backend
    pub storage: StorageConfig,
}

impl ServiceConfig {
    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.execution.default_max_iterations == 0 {
            return Err(Error::invalid_config(
                "execution.default_max_iterations",
                "must be at least 1",
            ));
        }
        if self.execution.item_batch_size == 0 {
            return Err(Error::invalid_config(
                "execution.item_batch_size",
                "must be at least 1",
            ));
        }
        if self.execution.finished_task_limit == 0 {
            return Err(Error::invalid_config(
                "execution.finished_task_limit",
                "must be at least 1",
            ));
        }
        if self.execution.id_fields.is_empty() {
            return Err(Error::invalid_config(
                "execution.id_fields",
                "must name at least one field",
            ));
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::invalid_config(
                "http.requests_per_second",
                "must be positive when set",
            ));
        }
        if let StorageConfig::Duckdb {
            executions_table, ..
        } = &self.storage
        {
            validate_table_name(executions_table)?;
        }
        Ok(())
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` socket address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// Outbound HTTP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent override
    pub user_agent: Option<String>,
    /// Process-wide outbound request rate
    pub requests_per_second: Option<u32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            requests_per_second: None,
        }
    }
}

impl HttpConfig {
    /// HTTP client configuration
    pub fn client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder().timeout(Duration::from_secs(self.timeout_secs));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        builder = match self.requests_per_second {
            Some(rps) => builder.throttle(ThrottleConfig::per_second(rps)),
            None => builder.unthrottled(),
        };
        builder.build()
    }
}

// ============================================================================
// Execution Config
// ============================================================================

/// Crawl settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Iteration cap for requests without `maxIterations`
    pub default_max_iterations: u32,
    /// Concurrent item saves per batch
    pub item_batch_size: usize,
    /// Rate-limit retry behavior
    pub rate_limit: RateLimitRetryConfig,
    /// Identifier fields in lookup order
    pub id_fields: Vec<String>,
    /// Finished crawls kept in the task registry
    pub finished_task_limit: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: DEFAULT_MAX_ITERATIONS,
            item_batch_size: DEFAULT_BATCH_SIZE,
            rate_limit: RateLimitRetryConfig::default(),
            id_fields: DEFAULT_ID_FIELDS.iter().map(ToString::to_string).collect(),
            finished_task_limit: DEFAULT_FINISHED_TASK_LIMIT,
        }
    }
}

impl ExecutionConfig {
    /// Orchestrator settings
    pub fn settings(&self) -> ExecutionSettings {
        ExecutionSettings::default()
            .with_default_max_iterations(self.default_max_iterations)
            .with_item_batch_size(self.item_batch_size)
            .with_retry(self.rate_limit.policy())
            .with_extractor(ItemExtractor::with_id_fields(self.id_fields.iter().cloned()))
            .with_finished_task_limit(self.finished_task_limit)
    }
}

/// Rate-limit retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRetryConfig {
    /// Base delay in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Delay growth
    #[serde(default)]
    pub backoff: BackoffType,
    /// Delay ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Consecutive retries per page; `null` retries forever
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<u32>,
}

impl Default for RateLimitRetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            backoff: BackoffType::default(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl RateLimitRetryConfig {
    /// Retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.delay_ms)),
            max_retries: self.max_retries,
        }
    }
}

fn default_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    60000
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_retries() -> Option<u32> {
    Some(10)
}

// ============================================================================
// Storage Config
// ============================================================================

/// Execution log and item sink backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process memory; lost on exit
    #[default]
    Memory,
    /// DuckDB file, or `:memory:`
    Duckdb {
        /// Database path
        #[serde(default = "default_db_path")]
        path: String,
        /// Executions table name
        #[serde(default = "default_executions_table")]
        executions_table: String,
    },
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_executions_table() -> String {
    DEFAULT_EXECUTIONS_TABLE.to_string()
}

impl StorageConfig {
    /// DuckDB backend at `path`
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self::Duckdb {
            path: path.into(),
            executions_table: default_executions_table(),
        }
    }

    /// Open the configured backend
    pub fn open(&self) -> Result<Storage> {
        match self {
            StorageConfig::Memory => Ok(Storage {
                log_store: Arc::new(MemoryLogStore::new()),
                sink: Arc::new(MemorySink::new()),
            }),
            StorageConfig::Duckdb {
                path,
                executions_table,
            } => {
                let store = if path == ":memory:" {
                    DuckDbStore::in_memory(executions_table)?
                } else {
                    DuckDbStore::open(path, executions_table)?
                };
                let store = Arc::new(store);
                Ok(Storage {
                    log_store: store.clone(),
                    sink: store,
                })
            }
        }
    }
}

/// Opened storage backend
#[derive(Clone)]
pub struct Storage {
    /// Execution log
    pub log_store: SharedLogStore,
    /// Item sink
    pub sink: SharedSink,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionLogStore, ExecutionRecord, ExecutionRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServiceConfig::from_yaml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.execution.default_max_iterations, 10);
        assert_eq!(config.execution.item_batch_size, 5);
        assert_eq!(config.execution.rate_limit.max_retries, Some(10));
        assert_eq!(config.execution.id_fields.len(), 8);
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  port: 9090
http:
  timeout_secs: 5
  user_agent: "crawler/1.0"
  requests_per_second: 4
execution:
  default_max_iterations: 25
  item_batch_size: 10
  rate_limit:
    delay_ms: 1000
    backoff: exponential
    max_delay_ms: 8000
    max_retries: null
  id_fields: [sku, id]
  finished_task_limit: 50
storage:
  backend: duckdb
  path: /tmp/pagewalk.duckdb
"#;

        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.http.requests_per_second, Some(4));
        assert_eq!(config.execution.rate_limit.max_retries, None);
        assert_eq!(config.execution.rate_limit.backoff, BackoffType::Exponential);
        assert_eq!(
            config.storage,
            StorageConfig::Duckdb {
                path: "/tmp/pagewalk.duckdb".to_string(),
                executions_table: "executions".to_string(),
            }
        );

        let settings = config.execution.settings();
        assert_eq!(settings.default_max_iterations, 25);
        assert_eq!(settings.item_batch_size, 10);
        assert_eq!(settings.finished_task_limit, 50);
        assert_eq!(settings.retry.max_retries, None);
        assert_eq!(settings.retry.calculate_backoff(2), Duration::from_secs(4));
        assert_eq!(settings.retry.calculate_backoff(5), Duration::from_secs(8));
        assert_eq!(settings.extractor.id_fields(), &["sku".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_http_client_config() {
        let http = HttpConfig {
            timeout_secs: 7,
            user_agent: Some("ua".to_string()),
            requests_per_second: Some(3),
        };
        let client = http.client_config();
        assert_eq!(client.timeout, Duration::from_secs(7));
        assert_eq!(client.user_agent, "ua");
        assert_eq!(client.throttle.unwrap().requests_per_second, 3);

        assert!(HttpConfig::default().client_config().throttle.is_none());
    }

    #[test]
    fn test_default_retry_policy() {
        assert_eq!(RateLimitRetryConfig::default().policy(), RetryPolicy::default());
    }

    #[test]
    fn test_validation_errors() {
        let err = ServiceConfig::from_yaml_str("execution:\n  item_batch_size: 0\n").unwrap_err();
        assert!(err.to_string().contains("item_batch_size"));

        assert!(ServiceConfig::from_yaml_str("execution:\n  default_max_iterations: 0\n").is_err());
        assert!(ServiceConfig::from_yaml_str("http:\n  requests_per_second: 0\n").is_err());
        assert!(
            ServiceConfig::from_yaml_str("execution:\n  finished_task_limit: 0\n").is_err()
        );
        assert!(ServiceConfig::from_yaml_str(
            "storage:\n  backend: duckdb\n  executions_table: \"bad name\"\n"
        )
        .is_err());
        assert!(ServiceConfig::from_yaml_str("storage:\n  backend: redis\n").is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let err = ServiceConfig::from_file("/nonexistent/pagewalk.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn test_open_storage_backends() {
        for storage in [StorageConfig::Memory, StorageConfig::duckdb(":memory:")] {
            let opened = storage.open().unwrap();
            let record = ExecutionRecord::new("exec-1", ExecutionRequest::get("https://x/y"));
            opened.log_store.create_parent(&record).await.unwrap();
            assert!(opened.log_store.get_parent("exec-1").await.unwrap().is_some());
        }
    }
}
