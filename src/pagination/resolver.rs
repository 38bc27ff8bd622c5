//! Next-page derivation
//!
//! Given the crawl's fixed style, the URL that was just fetched and its
//! response, compute the next request target or report exhaustion.

use super::detector::{link_header, CURSOR_FIELDS, TOTAL_FIELDS};
use super::types::{numeric_field, token_field, NextPage, PaginationStyle};
use crate::types::{JsonValue, OrderedStringMap};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use url::Url;

static NEXT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("valid link regex"));

const DEFAULT_OFFSET: u64 = 0;
const DEFAULT_LIMIT: u64 = 10;

/// Computes the next request URL for a crawl
#[derive(Debug, Clone, Default)]
pub struct NextPageResolver {
    /// `limit` the original request asked for, carried onto link-header URLs
    original_limit: Option<String>,
}

impl NextPageResolver {
    /// Create a resolver with an explicit original limit
    pub fn new(original_limit: Option<String>) -> Self {
        Self { original_limit }
    }

    /// Create a resolver for a request, taking `limit` from the configured
    /// query parameters first and the request URL second
    pub fn for_request(url: &Url, query_params: &OrderedStringMap) -> Self {
        let original_limit = query_params
            .get("limit")
            .filter(|v| !v.is_empty())
            .cloned()
            .or_else(|| query_param(url, "limit"));
        Self { original_limit }
    }

    /// Derive the next page for `style`
    pub fn resolve(
        &self,
        style: PaginationStyle,
        current_url: &Url,
        headers: &HeaderMap,
        body: &JsonValue,
    ) -> NextPage {
        match style {
            PaginationStyle::Link => self.resolve_link(current_url, headers),
            PaginationStyle::Bookmark => match token_field(body, &["bookmark"]) {
                Some(bookmark) => {
                    NextPage::with_url(set_query_param(current_url, "bookmark", &bookmark))
                }
                None => NextPage::Done,
            },
            PaginationStyle::Cursor => match token_field(body, &CURSOR_FIELDS) {
                Some(cursor) => NextPage::with_url(set_query_param(current_url, "cursor", &cursor)),
                None => NextPage::Done,
            },
            PaginationStyle::Offset => resolve_offset(current_url, body),
            PaginationStyle::None => NextPage::Done,
        }
    }

    fn resolve_link(&self, current_url: &Url, headers: &HeaderMap) -> NextPage {
        let Some(target) = link_header(headers).and_then(|value| next_link_target(&value)) else {
            return NextPage::Done;
        };
        let Ok(next) = current_url.join(&target) else {
            return NextPage::Done;
        };

        let mut next = remove_query_param(&next, "status");
        if query_param(&next, "limit").is_none() {
            if let Some(limit) = &self.original_limit {
                next.query_pairs_mut().append_pair("limit", limit);
            }
        }
        NextPage::with_url(next)
    }
}

/// Target of the `rel="next"` relation in a `Link` header value
pub(crate) fn next_link_target(header_value: &str) -> Option<String> {
    NEXT_LINK
        .captures(header_value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn resolve_offset(current_url: &Url, body: &JsonValue) -> NextPage {
    let Some(total) = numeric_field(body, &TOTAL_FIELDS) else {
        return NextPage::Done;
    };

    let offset = query_param(current_url, "offset")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_OFFSET);
    let limit = query_param(current_url, "limit")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_LIMIT);

    let next_offset = offset.saturating_add(limit);
    if next_offset >= total {
        NextPage::Done
    } else {
        NextPage::with_url(set_query_param(
            current_url,
            "offset",
            &next_offset.to_string(),
        ))
    }
}

// ============================================================================
// Query string helpers
// ============================================================================

/// First value of a query parameter
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Set a query parameter, replacing the first occurrence in place and
/// dropping any duplicates; appended when absent
pub fn set_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in url.query_pairs().into_owned() {
        if k == key {
            if !replaced {
                pairs.push((k, value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k, v));
        }
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }
    with_pairs(url, &pairs)
}

/// Remove every occurrence of a query parameter
pub fn remove_query_param(url: &Url, key: &str) -> Url {
    if query_param(url, key).is_none() {
        return url.clone();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| k != key)
        .collect();
    with_pairs(url, &pairs)
}

/// Append configured parameters not already present in the URL
///
/// Empty values are skipped.
pub fn merge_query_params(url: &Url, params: &OrderedStringMap) -> Url {
    let mut merged = url.clone();
    let missing: Vec<(&String, &String)> = params
        .iter()
        .filter(|(key, value)| !value.is_empty() && query_param(url, key).is_none())
        .collect();

    if !missing.is_empty() {
        let mut query = merged.query_pairs_mut();
        for (key, value) in missing {
            query.append_pair(key, value);
        }
    }
    merged
}

fn with_pairs(url: &Url, pairs: &[(String, String)]) -> Url {
    let mut next = url.clone();
    if pairs.is_empty() {
        next.set_query(None);
    } else {
        next.query_pairs_mut().clear().extend_pairs(pairs);
    }
    next
}
