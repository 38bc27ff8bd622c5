//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, StoreKind};
use crate::cli::server;
use crate::config::{ServiceConfig, StorageConfig};
use crate::engine::Orchestrator;
use crate::error::{Error, Result};
use crate::execution::{ExecutionLogStore, ExecutionRequest, ExecutionStatus};
use crate::http::HttpClient;
use crate::types::Method;
use serde_json::json;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let mut config = self.load_config()?;

        match &self.cli.command {
            Commands::Serve {
                port,
                store,
                db_path,
            } => {
                if let Some(port) = port {
                    config.server.port = *port;
                }
                apply_storage_override(&mut config, *store, db_path.as_deref());
                config.validate()?;
                self.serve(&config).await
            }
            Commands::Run {
                url,
                method,
                max_iterations,
                query,
                header,
                table,
                save,
            } => {
                let method: Method = method.parse().map_err(Error::invalid_request)?;
                let mut request = ExecutionRequest::new(method, url.clone());
                for (key, value) in query {
                    request = request.query(key.clone(), value.clone());
                }
                for (key, value) in header {
                    request = request.header(key.clone(), value.clone());
                }
                if let Some(max) = max_iterations {
                    request = request.max_iterations(*max);
                }
                if let Some(table) = table {
                    request.table_name = Some(table.clone());
                    request.save_data = *save;
                }
                self.run_once(&config, request).await
            }
        }
    }

    fn load_config(&self) -> Result<ServiceConfig> {
        match &self.cli.config {
            Some(path) => ServiceConfig::from_file(path),
            None => Ok(ServiceConfig::default()),
        }
    }

    async fn serve(&self, config: &ServiceConfig) -> Result<()> {
        let orchestrator = build_orchestrator(config)?;
        server::serve(&config.server, orchestrator).await
    }

    async fn run_once(&self, config: &ServiceConfig, request: ExecutionRequest) -> Result<()> {
        let orchestrator = build_orchestrator(config)?;
        let ack = orchestrator.start(request).await?;
        let status = orchestrator.wait(&ack.execution_id).await?;

        let store = orchestrator.log_store();
        let parent = store.get_parent(&ack.execution_id).await?;
        let children = store.list_children(&ack.execution_id).await?;

        let output = json!({
            "parent": parent,
            "children": children,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);

        match status {
            ExecutionStatus::Completed => Ok(()),
            other => Err(Error::Other(format!(
                "Execution {} finished with status {other}",
                ack.execution_id
            ))),
        }
    }
}

/// Wire storage, HTTP client and settings from the config
pub fn build_orchestrator(config: &ServiceConfig) -> Result<Orchestrator> {
    let storage = config.storage.open()?;
    let client = HttpClient::with_config(config.http.client_config())?;

    Ok(Orchestrator::new(client, storage.log_store)
        .with_sink(storage.sink)
        .with_settings(config.execution.settings()))
}

fn apply_storage_override(config: &mut ServiceConfig, store: Option<StoreKind>, db_path: Option<&str>) {
    match (store, db_path) {
        (Some(StoreKind::Memory), _) => config.storage = StorageConfig::Memory,
        (Some(StoreKind::Duckdb), path) => {
            config.storage = StorageConfig::duckdb(path.unwrap_or(":memory:"));
        }
        (None, Some(path)) => {
            if let StorageConfig::Duckdb { path: current, .. } = &mut config.storage {
                *current = path.to_string();
            } else {
                config.storage = StorageConfig::duckdb(path);
            }
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_store_override_selects_backend() {
        let mut config = ServiceConfig::default();
        apply_storage_override(&mut config, Some(StoreKind::Duckdb), Some("/tmp/x.db"));
        assert_eq!(config.storage, StorageConfig::duckdb("/tmp/x.db"));

        apply_storage_override(&mut config, Some(StoreKind::Memory), None);
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_db_path_alone_keeps_table_name() {
        let mut config = ServiceConfig::default();
        config.storage = StorageConfig::Duckdb {
            path: ":memory:".to_string(),
            executions_table: "crawl_log".to_string(),
        };
        apply_storage_override(&mut config, None, Some("data.db"));
        assert_eq!(
            config.storage,
            StorageConfig::Duckdb {
                path: "data.db".to_string(),
                executions_table: "crawl_log".to_string(),
            }
        );
    }

    #[test]
    fn test_no_override_keeps_config() {
        let mut config = ServiceConfig::default();
        apply_storage_override(&mut config, None, None);
        assert_eq!(config.storage, StorageConfig::Memory);
    }
}
