//! Pagination module
//!
//! Supports: Link Header, Bookmark, Cursor, Offset, None
//!
//! # Overview
//!
//! Third-party APIs rarely declare how they paginate. The detector inspects
//! the first page's response once and classifies the style; the resolver then
//! derives every following request URL from the current URL and response,
//! or reports that the crawl is exhausted.

mod detector;
mod resolver;
mod types;

pub use detector::{
    detect, detect_bookmark, detect_cursor, detect_link_header, detect_offset, detect_with,
    Detector, DEFAULT_DETECTORS,
};
pub use resolver::{merge_query_params, query_param, remove_query_param, set_query_param, NextPageResolver};
pub use types::{NextPage, PaginationState, PaginationStyle};
