//! Batched item persistence
//!
//! Saves run concurrently inside a batch; the next batch starts only after
//! every save of the current one has settled.

use super::types::{RequestContext, SharedSink, SinkMetadata, SinkRecord};
use crate::extract::ExtractedItem;
use crate::types::JsonValue;
use chrono::Utc;
use futures::future::join_all;
use tracing::warn;

/// Default number of concurrent saves per batch
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Outcome of saving one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Identifiers the sink accepted, in item order
    pub saved_ids: Vec<String>,
    /// Identifiers that failed with the error message
    pub failed: Vec<(String, String)>,
}

/// Writes a page's items to a sink table in fixed-size batches
#[derive(Clone)]
pub struct BatchItemSaver {
    sink: SharedSink,
    batch_size: usize,
}

impl BatchItemSaver {
    /// Create a saver with the default batch size
    pub fn new(sink: SharedSink) -> Self {
        Self::with_batch_size(sink, DEFAULT_BATCH_SIZE)
    }

    /// Create a saver with an explicit batch size (at least 1)
    pub fn with_batch_size(sink: SharedSink, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Batch size in use
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Save every item of a page
    ///
    /// A failed save is logged and left out of `saved_ids`; it never aborts
    /// the batch or the page.
    pub async fn save_page(
        &self,
        table: &str,
        items: &[ExtractedItem],
        request: &RequestContext,
        status: u16,
    ) -> SaveReport {
        let total_items = items.len();
        let mut report = SaveReport::default();

        for (batch_no, batch) in items.chunks(self.batch_size).enumerate() {
            let offset = batch_no * self.batch_size;
            let saves = batch.iter().enumerate().map(|(i, item)| {
                let record = SinkRecord {
                    id: item.id.clone(),
                    item: stringify_numeric_id(item.payload.clone()),
                    timestamp: Utc::now(),
                    metadata: SinkMetadata {
                        request: request.clone(),
                        status,
                        item_index: offset + i,
                        total_items,
                        original_id: item.original_id.clone(),
                    },
                };
                async move {
                    let result = self.sink.put_item(table, &record).await;
                    (record.id, result)
                }
            });

            for (id, result) in join_all(saves).await {
                match result {
                    Ok(()) => report.saved_ids.push(id),
                    Err(e) => {
                        warn!(table, item_id = %id, error = %e, "Item save failed");
                        report.failed.push((id, e.to_string()));
                    }
                }
            }
        }

        report
    }
}

/// Payload with a numeric `id` replaced by its string form
///
/// The raw value stays available as `metadata.originalId`.
pub fn stringify_numeric_id(payload: JsonValue) -> JsonValue {
    match payload {
        JsonValue::Object(mut map) => {
            if let Some(JsonValue::Number(n)) = map.get("id") {
                let id = n.to_string();
                map.insert("id".to_string(), JsonValue::String(id));
            }
            JsonValue::Object(map)
        }
        other => other,
    }
}

impl std::fmt::Debug for BatchItemSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchItemSaver")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}
