//! Item sinks
//!
//! Optional persistence of extracted items into a named table.

mod memory;
mod saver;
mod types;

pub use memory::MemorySink;
pub use saver::{BatchItemSaver, SaveReport, DEFAULT_BATCH_SIZE};
pub use types::{
    redact_headers, ItemSink, RequestContext, SharedSink, SinkMetadata, SinkRecord,
    SENSITIVE_HEADERS,
};
