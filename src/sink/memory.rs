//! In-memory item sink

use super::types::{ItemSink, SinkRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Item sink holding tables in process memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    tables: Arc<RwLock<HashMap<String, BTreeMap<String, SinkRecord>>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of a table ordered by id
    pub async fn records(&self, table: &str) -> Vec<SinkRecord> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of records in a table
    pub async fn count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl ItemSink for MemorySink {
    async fn put_item(&self, table: &str, record: &SinkRecord) -> Result<()> {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
