//! Sink types and traits

use crate::error::Result;
use crate::execution::ExecutionRequest;
use crate::types::{JsonValue, Method, OrderedStringMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Header names whose values never reach a sink
pub const SENSITIVE_HEADERS: [&str; 4] =
    ["authorization", "cookie", "proxy-authorization", "x-api-key"];

const REDACTED: &str = "[REDACTED]";

/// Request that produced a page, as stored next to each item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// HTTP method
    pub method: Method,
    /// Concrete URL of the page
    pub url: String,
    /// Configured query parameters
    pub query_params: OrderedStringMap,
    /// Request headers, sensitive values redacted
    pub headers: OrderedStringMap,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
}

impl RequestContext {
    /// Context for one page of `request`
    pub fn for_page(request: &ExecutionRequest, page_url: &Url) -> Self {
        Self {
            method: request.method,
            url: page_url.to_string(),
            query_params: request.query_params.clone(),
            headers: redact_headers(&request.headers),
            body: request.body.clone().filter(|_| request.method.sends_body()),
        }
    }
}

/// Copy of `headers` with sensitive values replaced
pub fn redact_headers(headers: &OrderedStringMap) -> OrderedStringMap {
    headers
        .iter()
        .map(|(name, value)| {
            let sensitive = SENSITIVE_HEADERS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(name));
            let value = if sensitive { REDACTED } else { value.as_str() };
            (name.clone(), value.to_string())
        })
        .collect()
}

/// Provenance of a stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkMetadata {
    /// Request that produced the page
    pub request: RequestContext,
    /// Response status of the page
    pub status: u16,
    /// Position of the item in its page
    pub item_index: usize,
    /// Items in the page
    pub total_items: usize,
    /// Raw `id` of the item before string coercion
    #[serde(default)]
    pub original_id: Option<JsonValue>,
}

/// One item as written to a sink table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    /// Item identifier, the table key
    pub id: String,
    /// Item payload
    pub item: JsonValue,
    /// Write time
    pub timestamp: DateTime<Utc>,
    /// Provenance
    pub metadata: SinkMetadata,
}

/// Destination for extracted items
///
/// Writes are upserts keyed by `record.id` within `table`.
#[async_trait]
pub trait ItemSink: Send + Sync {
    /// Store one item
    async fn put_item(&self, table: &str, record: &SinkRecord) -> Result<()>;
}

/// Shared trait object handle
pub type SharedSink = Arc<dyn ItemSink>;
