//! Pagination style detection
//!
//! Each detector is a pure predicate over page 1's headers and body. They are
//! evaluated in a fixed priority order and the first match wins:
//! link header, bookmark, cursor, offset. Nothing matching means `None`.

use super::types::{is_truthy, numeric_field, PaginationStyle};
use crate::types::JsonValue;
use reqwest::header::HeaderMap;

/// A single detection heuristic
pub type Detector = fn(&HeaderMap, &JsonValue) -> Option<PaginationStyle>;

/// Built-in detectors in priority order
pub const DEFAULT_DETECTORS: [Detector; 4] = [
    detect_link_header,
    detect_bookmark,
    detect_cursor,
    detect_offset,
];

pub(crate) const CURSOR_FIELDS: [&str; 2] = ["next_cursor", "cursor"];
pub(crate) const TOTAL_FIELDS: [&str; 2] = ["total_count", "total"];

/// Classify a first-page response with the built-in detectors
pub fn detect(headers: &HeaderMap, body: &JsonValue) -> PaginationStyle {
    detect_with(&DEFAULT_DETECTORS, headers, body)
}

/// Classify a response with an explicit detector list
pub fn detect_with(detectors: &[Detector], headers: &HeaderMap, body: &JsonValue) -> PaginationStyle {
    detectors
        .iter()
        .find_map(|detector| detector(headers, body))
        .unwrap_or(PaginationStyle::None)
}

/// `Link` header carrying a `rel="next"` relation
pub fn detect_link_header(headers: &HeaderMap, _body: &JsonValue) -> Option<PaginationStyle> {
    link_header(headers)
        .filter(|value| value.contains("rel=\"next\""))
        .map(|_| PaginationStyle::Link)
}

/// Non-empty `bookmark` field
pub fn detect_bookmark(_headers: &HeaderMap, body: &JsonValue) -> Option<PaginationStyle> {
    body.get("bookmark")
        .filter(|value| is_truthy(value))
        .map(|_| PaginationStyle::Bookmark)
}

/// Non-empty `next_cursor` or `cursor` field
pub fn detect_cursor(_headers: &HeaderMap, body: &JsonValue) -> Option<PaginationStyle> {
    CURSOR_FIELDS
        .iter()
        .filter_map(|field| body.get(*field))
        .any(is_truthy)
        .then_some(PaginationStyle::Cursor)
}

/// Numeric `total_count` or `total` field
pub fn detect_offset(_headers: &HeaderMap, body: &JsonValue) -> Option<PaginationStyle> {
    numeric_field(body, &TOTAL_FIELDS).map(|_| PaginationStyle::Offset)
}

/// All `Link` header values joined the way a single folded header reads
pub(crate) fn link_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all("link")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}
