//! Execution log types
//!
//! Parent and child records are stored as JSON documents with kebab-case
//! field names; the request and acknowledgment use the camelCase names of
//! the HTTP surface.

use crate::error::{Error, Result};
use crate::pagination::PaginationStyle;
use crate::types::{JsonValue, Method, OrderedStringMap, OptionStringExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Default iteration cap when a request does not set one
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a parent execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    /// Parent record written, crawl not started yet
    Initialized,
    /// Crawl running
    InProgress,
    /// Crawl ended without an upstream error
    Completed,
    /// Crawl ended on a terminal upstream failure or a fault
    Error,
    /// Crawl stopped by an operator
    Cancelled,
}

impl ExecutionStatus {
    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Initialized => "initialized",
            ExecutionStatus::InProgress => "inProgress",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition can happen
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Error | ExecutionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request
// ============================================================================

/// A paginated fetch request, immutable once the crawl starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// HTTP method
    pub method: Method,
    /// Target URL of page 1
    pub url: String,
    /// Query parameters merged into page 1's URL
    #[serde(default)]
    pub query_params: OrderedStringMap,
    /// Request headers
    #[serde(default)]
    pub headers: OrderedStringMap,
    /// Request body, ignored for GET and HEAD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
    /// Iteration cap; the service default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    /// Sink table for extracted items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Whether extracted items are persisted
    #[serde(default)]
    pub save_data: bool,
}

impl ExecutionRequest {
    /// Create a request for `url` with the given method
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query_params: OrderedStringMap::new(),
            headers: OrderedStringMap::new(),
            body: None,
            max_iterations: None,
            table_name: None,
            save_data: false,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the iteration cap
    #[must_use]
    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Persist extracted items into `table`
    #[must_use]
    pub fn save_to(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self.save_data = true;
        self
    }

    /// Iteration cap, falling back to `default`
    pub fn effective_max_iterations(&self, default: u32) -> u32 {
        self.max_iterations.unwrap_or(default)
    }

    /// Sink table when persistence is enabled and a table is named
    pub fn sink_table(&self) -> Option<&str> {
        if !self.save_data {
            return None;
        }
        self.table_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Check the request and parse its URL
    pub fn validate(&self) -> Result<Url> {
        let raw = Some(self.url.clone())
            .none_if_empty()
            .ok_or_else(|| Error::invalid_request("url is required"))?;
        let url = Url::parse(raw.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_request(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(Error::invalid_request("maxIterations must be at least 1"));
        }
        Ok(url)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A terminal upstream failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamError {
    /// Response status
    pub status: u16,
    /// Decoded response body
    pub body: JsonValue,
    /// URL that failed
    pub url: String,
}

impl UpstreamError {
    /// Create an upstream error
    pub fn new(status: u16, body: JsonValue, url: impl Into<String>) -> Self {
        Self {
            status,
            body,
            url: url.into(),
        }
    }
}

/// Running totals of a crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionProgress {
    /// Pages that produced a child record
    pub pages_processed: u32,
    /// Items extracted so far
    pub total_items_processed: u64,
    /// Detected style, once known
    pub pagination_type: Option<PaginationStyle>,
}

/// Parent execution record, one per crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionRecord {
    /// Execution identifier
    pub exec_id: String,
    /// Original request
    pub request: ExecutionRequest,
    /// Current status
    pub status: ExecutionStatus,
    /// Set once when the crawl terminates
    pub is_last: bool,
    /// Items extracted so far
    pub total_items_processed: u64,
    /// Child records written so far
    pub pages_processed: u32,
    /// Detected style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_type: Option<PaginationStyle>,
    /// Terminal upstream failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<UpstreamError>,
    /// Fault message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Create an `initialized` record
    pub fn new(exec_id: impl Into<String>, request: ExecutionRequest) -> Self {
        let now = Utc::now();
        Self {
            exec_id: exec_id.into(),
            request,
            status: ExecutionStatus::Initialized,
            is_last: false,
            total_items_processed: 0,
            pages_processed: 0,
            pagination_type: None,
            last_error: None,
            error_message: None,
            timestamp: now,
            updated_at: now,
        }
    }

    /// Apply a status transition
    ///
    /// `is_last` never flips back once set.
    pub fn set_status(&mut self, status: ExecutionStatus, is_last: bool) {
        self.status = status;
        self.is_last = self.is_last || is_last;
        self.updated_at = Utc::now();
    }

    /// Replace the running totals
    pub fn set_progress(&mut self, progress: &ExecutionProgress) {
        self.pages_processed = progress.pages_processed;
        self.total_items_processed = progress.total_items_processed;
        if progress.pagination_type.is_some() {
            self.pagination_type = progress.pagination_type;
        }
        self.updated_at = Utc::now();
    }

    /// Record why the crawl failed
    pub fn set_failure(&mut self, last_error: Option<UpstreamError>, message: Option<String>) {
        if last_error.is_some() {
            self.last_error = last_error;
        }
        if message.is_some() {
            self.error_message = message;
        }
        self.updated_at = Utc::now();
    }

    /// Current totals
    pub fn progress(&self) -> ExecutionProgress {
        ExecutionProgress {
            pages_processed: self.pages_processed,
            total_items_processed: self.total_items_processed,
            pagination_type: self.pagination_type,
        }
    }
}

/// Child record, one per recorded page, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChildExecutionRecord {
    /// Parent execution identifier
    pub exec_id: String,
    /// Child identifier
    pub child_exec_id: String,
    /// Page ordinal (1-based)
    pub iteration_no: u32,
    /// Items extracted from this page
    pub items_in_current_page: usize,
    /// Items extracted up to and including this page
    pub total_items_processed: u64,
    /// URL fetched for this page
    pub request_url: String,
    /// Style of the crawl
    pub pagination_type: PaginationStyle,
    /// Response status
    pub response_status: u16,
    /// Whether this is the crawl's final page
    pub is_last: bool,
    /// Identifiers of every extracted item
    pub item_ids: Vec<String>,
    /// Items the sink accepted
    pub saved_items: usize,
    /// Write time
    pub timestamp: DateTime<Utc>,
}

/// Immediate response to a started crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionAck {
    /// Execution identifier
    pub execution_id: String,
    /// Always `initialized`
    pub status: ExecutionStatus,
    /// Echoed method
    pub method: Method,
    /// Echoed URL
    pub url: String,
    /// Effective iteration cap
    pub max_iterations: u32,
    /// Acknowledgment time
    pub timestamp: DateTime<Utc>,
}

impl ExecutionAck {
    /// Acknowledge a freshly created parent record
    pub fn from_record(record: &ExecutionRecord, max_iterations: u32) -> Self {
        Self {
            execution_id: record.exec_id.clone(),
            status: record.status,
            method: record.request.method,
            url: record.request.url.clone(),
            max_iterations,
            timestamp: record.timestamp,
        }
    }
}
