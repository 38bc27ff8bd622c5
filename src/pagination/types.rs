//! Pagination types
//!
//! Defines the pagination style, the resolver's verdict and the per-crawl
//! working state held by the orchestrator.

use crate::execution::UpstreamError;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How a target API signals further pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    /// `Link: <url>; rel="next"` response header (Shopify, GitHub)
    Link,
    /// `bookmark` token in the body (Pinterest)
    Bookmark,
    /// `next_cursor` / `cursor` token in the body
    Cursor,
    /// `total_count` / `total` in the body with offset/limit query parameters
    Offset,
    /// Single page
    #[default]
    None,
}

impl PaginationStyle {
    /// Lower-case name as stored in the execution log
    pub fn as_str(self) -> &'static str {
        match self {
            PaginationStyle::Link => "link",
            PaginationStyle::Bookmark => "bookmark",
            PaginationStyle::Cursor => "cursor",
            PaginationStyle::Offset => "offset",
            PaginationStyle::None => "none",
        }
    }
}

impl fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch this URL next
    Continue {
        /// Next request target
        url: Url,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with a new URL
    pub fn with_url(url: Url) -> Self {
        Self::Continue { url }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Next URL, if any
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Continue { url } => Some(url),
            Self::Done => None,
        }
    }
}

/// Working state of one crawl
///
/// The style is `None` (undetected) until page 1's response has been seen and
/// is never changed afterwards.
#[derive(Debug, Clone)]
pub struct PaginationState {
    /// URL of the next request
    pub url: Url,
    /// Detected style
    pub style: Option<PaginationStyle>,
    /// Current page ordinal (1-based)
    pub page: u32,
    /// Whether another page should be fetched
    pub has_more_pages: bool,
    /// Last terminal upstream error
    pub last_error: Option<UpstreamError>,
    /// Items extracted so far
    pub total_items: u64,
    /// Pages that produced a child record
    pub pages_recorded: u32,
}

impl PaginationState {
    /// Create a new pagination state starting at page 1
    pub fn new(url: Url) -> Self {
        Self {
            url,
            style: None,
            page: 1,
            has_more_pages: true,
            last_error: None,
            total_items: 0,
            pages_recorded: 0,
        }
    }

    /// Whether the loop should fetch another page under the iteration cap
    pub fn should_continue(&self, max_iterations: u32) -> bool {
        self.has_more_pages && self.page <= max_iterations
    }

    /// Record the detected style; later calls are ignored
    pub fn set_style(&mut self, style: PaginationStyle) {
        if self.style.is_none() {
            self.style = Some(style);
        }
    }

    /// Detected style, `None` style while undetected
    pub fn style_or_none(&self) -> PaginationStyle {
        self.style.unwrap_or_default()
    }

    /// Apply the resolver's verdict
    pub fn apply(&mut self, next: NextPage) {
        match next {
            NextPage::Continue { url } => self.url = url,
            NextPage::Done => self.has_more_pages = false,
        }
    }

    /// Stop the crawl on a terminal upstream error
    pub fn fail(&mut self, error: UpstreamError) {
        self.last_error = Some(error);
        self.has_more_pages = false;
    }

    /// Add extracted items
    pub fn add_items(&mut self, count: usize) {
        self.total_items += count as u64;
    }

    /// Increment page number
    pub fn next_page(&mut self) {
        self.page += 1;
    }
}

/// JavaScript-style truthiness used by the body heuristics
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// First truthy token among `fields`, as a string
pub(crate) fn token_field(body: &JsonValue, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| body.get(*field))
        .find(|value| is_truthy(value))
        .map(|value| match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
}

/// First numeric value among `fields` (numbers or numeric strings)
pub(crate) fn numeric_field(body: &JsonValue, fields: &[&str]) -> Option<u64> {
    fields
        .iter()
        .filter_map(|field| body.get(*field))
        .find_map(|value| match value {
            JsonValue::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}
