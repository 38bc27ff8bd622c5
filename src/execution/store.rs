//! Execution log store interface and the in-memory implementation

use super::types::{
    ChildExecutionRecord, ExecutionProgress, ExecutionRecord, ExecutionStatus, UpstreamError,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-mostly log of parent and child execution records
///
/// The parent is mutated in place; children are never updated once appended.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Write a new parent record
    async fn create_parent(&self, record: &ExecutionRecord) -> Result<()>;

    /// Set the parent's status; `is_last` is sticky once true
    async fn update_parent_status(
        &self,
        exec_id: &str,
        status: ExecutionStatus,
        is_last: bool,
    ) -> Result<()>;

    /// Replace the parent's running totals
    async fn update_parent_progress(&self, exec_id: &str, progress: &ExecutionProgress)
        -> Result<()>;

    /// Store why the crawl failed on the parent
    async fn record_parent_failure(
        &self,
        exec_id: &str,
        last_error: Option<&UpstreamError>,
        message: Option<&str>,
    ) -> Result<()>;

    /// Append a child record
    async fn append_child(&self, record: &ChildExecutionRecord) -> Result<()>;

    /// Read a parent record
    async fn get_parent(&self, exec_id: &str) -> Result<Option<ExecutionRecord>>;

    /// Children of a parent ordered by page number
    async fn list_children(&self, exec_id: &str) -> Result<Vec<ChildExecutionRecord>>;
}

/// Shared trait object handle
pub type SharedLogStore = Arc<dyn ExecutionLogStore>;

#[derive(Debug, Default)]
struct LogTables {
    parents: HashMap<String, ExecutionRecord>,
    children: HashMap<String, Vec<ChildExecutionRecord>>,
}

/// Process-local execution log
#[derive(Debug, Default, Clone)]
pub struct MemoryLogStore {
    tables: Arc<RwLock<LogTables>>,
}

impl MemoryLogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parent records
    pub async fn parent_count(&self) -> usize {
        self.tables.read().await.parents.len()
    }

    async fn modify_parent<F>(&self, exec_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ExecutionRecord) + Send,
    {
        let mut tables = self.tables.write().await;
        let record = tables
            .parents
            .get_mut(exec_id)
            .ok_or_else(|| Error::not_found(exec_id))?;
        f(record);
        Ok(())
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryLogStore {
    async fn create_parent(&self, record: &ExecutionRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.parents.contains_key(&record.exec_id) {
            return Err(Error::log_store(format!(
                "execution '{}' already exists",
                record.exec_id
            )));
        }
        tables
            .parents
            .insert(record.exec_id.clone(), record.clone());
        Ok(())
    }

    async fn update_parent_status(
        &self,
        exec_id: &str,
        status: ExecutionStatus,
        is_last: bool,
    ) -> Result<()> {
        self.modify_parent(exec_id, |record| record.set_status(status, is_last))
            .await
    }

    async fn update_parent_progress(
        &self,
        exec_id: &str,
        progress: &ExecutionProgress,
    ) -> Result<()> {
        self.modify_parent(exec_id, |record| record.set_progress(progress))
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
        let mut tables = self.tables.write().await;
        if !tables.parents.contains_key(&record.exec_id) {
            return Err(Error::not_found(&record.exec_id));
        }
        tables
            .children
            .entry(record.exec_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn get_parent(&self, exec_id: &str) -> Result<Option<ExecutionRecord>> {
        Ok(self.tables.read().await.parents.get(exec_id).cloned())
    }

    async fn list_children(&self, exec_id: &str) -> Result<Vec<ChildExecutionRecord>> {
        let tables = self.tables.read().await;
        let mut children = tables.children.get(exec_id).cloned().unwrap_or_default();
        children.sort_by_key(|child| child.iteration_no);
        Ok(children)
    }
}
