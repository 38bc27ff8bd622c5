//! DuckDB-backed execution log and item sink
//!
//! Every record is a JSON document in a VARCHAR column. The executions table
//! keys parents and children by `(exec_id, child_exec_id)`; a parent uses its
//! own id as `child_exec_id`.
//!
//! DuckDB calls block, so every statement runs on tokio's blocking pool with
//! the connection lock taken there.

use crate::error::{Error, Result};
use crate::execution::{
    ChildExecutionRecord, ExecutionLogStore, ExecutionProgress, ExecutionRecord, ExecutionStatus,
    UpstreamError,
};
use crate::sink::{ItemSink, SinkRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Default name of the executions table
pub const DEFAULT_EXECUTIONS_TABLE: &str = "executions";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

/// Check a table name before it is spliced into SQL
pub fn validate_table_name(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(Error::invalid_config(
            "table",
            format!("'{name}' is not a valid table name"),
        ))
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )
        .map_err(|e| Error::sink(table, format!("Failed to inspect catalog: {e}")))?;
    Ok(count > 0)
}

struct Inner {
    conn: Connection,
    executions_table: String,
    sink_tables: HashSet<String>,
}

/// Execution log and item sink on one DuckDB database
pub struct DuckDbStore {
    inner: Arc<Mutex<Inner>>,
    executions_table: String,
    location: String,
}

impl DuckDbStore {
    /// Open a database file, creating it if needed
    pub fn open(path: impl AsRef<Path>, executions_table: &str) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::log_store(format!("Failed to open DuckDB at {}: {e}", path.display())))?;
        Self::init(conn, executions_table, path.display().to_string())
    }

    /// Open a private in-memory database
    pub fn in_memory(executions_table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::log_store(format!("Failed to create DuckDB connection: {e}")))?;
        Self::init(conn, executions_table, ":memory:".to_string())
    }

    fn init(conn: Connection, executions_table: &str, location: String) -> Result<Self> {
        let table = validate_table_name(executions_table)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                exec_id VARCHAR NOT NULL,
                child_exec_id VARCHAR NOT NULL,
                data VARCHAR NOT NULL,
                PRIMARY KEY (exec_id, child_exec_id)
            );"
        ))
        .map_err(|e| Error::log_store(format!("Failed to create table {table}: {e}")))?;

        debug!(location = %location, table, "DuckDB store ready");

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                executions_table: table.to_string(),
                sink_tables: HashSet::new(),
            })),
            executions_table: table.to_string(),
            location,
        })
    }

    /// Database file path, or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Records of a sink table ordered by id
    pub async fn sink_records(&self, table: &str) -> Result<Vec<SinkRecord>> {
        let table = validate_table_name(table)?.to_string();
        self.blocking(move |inner| inner.sink_records(&table)).await
    }

    /// Run `f` against the connection on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Inner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            // A panicked statement leaves no partial state behind the lock
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut *guard)
        })
        .await
        .map_err(|e| Error::log_store(format!("DuckDB task failed: {e}")))?
    }

    async fn modify_parent<F>(&self, exec_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ExecutionRecord) + Send + 'static,
    {
        let exec_id = exec_id.to_string();
        self.blocking(move |inner| {
            let mut record = inner
                .read_parent(&exec_id)?
                .ok_or_else(|| Error::not_found(&exec_id))?;
            f(&mut record);

            let sql = format!(
                "UPDATE {} SET data = ? WHERE exec_id = ? AND child_exec_id = ?",
                inner.executions_table
            );
            let data = serde_json::to_string(&record)?;
            inner
                .conn
                .execute(&sql, params![data, exec_id, exec_id])
                .map_err(|e| Error::log_store(format!("Failed to update parent {exec_id}: {e}")))?;
            Ok(())
        })
        .await
    }
}

impl Inner {
    fn read_parent(&self, exec_id: &str) -> Result<Option<ExecutionRecord>> {
        let sql = format!(
            "SELECT data FROM {} WHERE exec_id = ? AND child_exec_id = ?",
            self.executions_table
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::log_store(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query_map(params![exec_id, exec_id], |row| row.get::<_, String>(0))
            .map_err(|e| Error::log_store(format!("Failed to read parent: {e}")))?;

        let data = rows
            .next()
            .transpose()
            .map_err(|e| Error::log_store(format!("Failed to read row: {e}")))?;
        let record = data.map(|d| serde_json::from_str(&d)).transpose()?;
        Ok(record)
    }

    fn insert(&self, exec_id: &str, child_id: &str, data: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (exec_id, child_exec_id, data) VALUES (?, ?, ?)",
            self.executions_table
        );
        self.conn
            .execute(&sql, params![exec_id, child_id, data])
            .map_err(|e| Error::log_store(format!("Failed to insert record {exec_id}/{child_id}: {e}")))?;
        Ok(())
    }

    fn list_children(&self, exec_id: &str) -> Result<Vec<ChildExecutionRecord>> {
        let sql = format!(
            "SELECT data FROM {} WHERE exec_id = ? AND child_exec_id <> exec_id",
            self.executions_table
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::log_store(format!("Failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![exec_id], |row| row.get::<_, String>(0))
            .map_err(|e| Error::log_store(format!("Failed to list children: {e}")))?;

        let mut children = Vec::new();
        for data in rows {
            let data = data.map_err(|e| Error::log_store(format!("Failed to read row: {e}")))?;
            children.push(serde_json::from_str::<ChildExecutionRecord>(&data)?);
        }
        children.sort_by_key(|child| child.iteration_no);
        Ok(children)
    }

    fn ensure_sink_table(&mut self, table: &str) -> Result<()> {
        if self.sink_tables.contains(table) {
            return Ok(());
        }
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id VARCHAR PRIMARY KEY,
                    item VARCHAR,
                    \"timestamp\" VARCHAR,
                    metadata VARCHAR
                );"
            ))
            .map_err(|e| Error::sink(table, format!("Failed to create table: {e}")))?;
        self.sink_tables.insert(table.to_string());
        Ok(())
    }

    fn sink_records(&self, table: &str) -> Result<Vec<SinkRecord>> {
        if !self.sink_tables.contains(table) && !table_exists(&self.conn, table)? {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT id, item, \"timestamp\", metadata FROM {table} ORDER BY id");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::sink(table, format!("Failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| Error::sink(table, format!("Failed to query: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, item, timestamp, metadata) =
                row.map_err(|e| Error::sink(table, format!("Failed to read row: {e}")))?;
            records.push(SinkRecord {
                id,
                item: serde_json::from_str(&item)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| Error::sink(table, format!("Bad timestamp '{timestamp}': {e}")))?
                    .with_timezone(&Utc),
                metadata: serde_json::from_str(&metadata)?,
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl ExecutionLogStore for DuckDbStore {
    async fn create_parent(&self, record: &ExecutionRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;
        let exec_id = record.exec_id.clone();
        self.blocking(move |inner| inner.insert(&exec_id, &exec_id, &data))
            .await
    }

    async fn update_parent_status(
        &self,
        exec_id: &str,
        status: ExecutionStatus,
        is_last: bool,
    ) -> Result<()> {
        self.modify_parent(exec_id, move |record| record.set_status(status, is_last))
            .await
    }

    async fn update_parent_progress(
        &self,
        exec_id: &str,
        progress: &ExecutionProgress,
    ) -> Result<()> {
        let progress = progress.clone();
        self.modify_parent(exec_id, move |record| record.set_progress(&progress))
            .await
    }

    async fn record_parent_failure(
        &self,
        exec_id: &str,
        last_error: Option<&UpstreamError>,
        message: Option<&str>,
    ) -> Result<()> {
        let last_error = last_error.cloned();
        let message = message.map(ToString::to_string);
        self.modify_parent(exec_id, move |record| record.set_failure(last_error, message))
            .await
    }

    async fn append_child(&self, record: &ChildExecutionRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;
        let exec_id = record.exec_id.clone();
        let child_id = record.child_exec_id.clone();
        self.blocking(move |inner| {
            if inner.read_parent(&exec_id)?.is_none() {
                return Err(Error::not_found(&exec_id));
            }
            inner.insert(&exec_id, &child_id, &data)
        })
        .await
    }

    async fn get_parent(&self, exec_id: &str) -> Result<Option<ExecutionRecord>> {
        let exec_id = exec_id.to_string();
        self.blocking(move |inner| inner.read_parent(&exec_id)).await
    }

    async fn list_children(&self, exec_id: &str) -> Result<Vec<ChildExecutionRecord>> {
        let exec_id = exec_id.to_string();
        self.blocking(move |inner| inner.list_children(&exec_id))
            .await
    }
}

#[async_trait]
impl ItemSink for DuckDbStore {
    async fn put_item(&self, table: &str, record: &SinkRecord) -> Result<()> {
        let table = validate_table_name(table)?.to_string();
        let item = serde_json::to_string(&record.item)?;
        let metadata = serde_json::to_string(&record.metadata)?;
        let timestamp = record.timestamp.to_rfc3339();
        let id = record.id.clone();
        self.blocking(move |inner| {
            inner.ensure_sink_table(&table)?;
            let sql = format!(
                "INSERT OR REPLACE INTO {table} (id, item, \"timestamp\", metadata) VALUES (?, ?, ?, ?)"
            );
            inner
                .conn
                .execute(&sql, params![id, item, timestamp, metadata])
                .map_err(|e| Error::sink(&table, format!("Failed to write item {id}: {e}")))?;
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("location", &self.location)
            .field("executions_table", &self.executions_table)
            .finish_non_exhaustive()
    }
}
