//! Crawl events
//!
//! The orchestrator reports what happened as typed facts. Sinks decide how
//! to surface them: structured `tracing` output by default, or a channel to
//! an external collaborator.

use crate::execution::ExecutionStatus;
use crate::pagination::PaginationStyle;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Facts emitted while a crawl runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlEvent {
    // ============================================================================
    // Execution events
    // ============================================================================
    ExecutionStarted {
        exec_id: String,
        url: String,
        max_iterations: u32,
    },

    ExecutionFinished {
        exec_id: String,
        status: ExecutionStatus,
        pages: u32,
        items: u64,
    },

    // ============================================================================
    // Page events
    // ============================================================================
    PageStarted {
        exec_id: String,
        page: u32,
        url: String,
    },

    PageFetched {
        exec_id: String,
        page: u32,
        status: u16,
    },

    PaginationDetected {
        exec_id: String,
        style: PaginationStyle,
    },

    PageRetried {
        exec_id: String,
        page: u32,
        attempt: u32,
        status: u16,
        #[serde(with = "millis")]
        delay: Duration,
    },

    PageFailed {
        exec_id: String,
        page: u32,
        status: u16,
        url: String,
    },

    ItemsSaved {
        exec_id: String,
        page: u32,
        table: String,
        saved: usize,
        failed: usize,
    },

    ChildRecorded {
        exec_id: String,
        page: u32,
        items: usize,
        is_last: bool,
    },
}

impl CrawlEvent {
    /// Execution the event belongs to
    pub fn exec_id(&self) -> &str {
        match self {
            CrawlEvent::ExecutionStarted { exec_id, .. }
            | CrawlEvent::ExecutionFinished { exec_id, .. }
            | CrawlEvent::PageStarted { exec_id, .. }
            | CrawlEvent::PageFetched { exec_id, .. }
            | CrawlEvent::PaginationDetected { exec_id, .. }
            | CrawlEvent::PageRetried { exec_id, .. }
            | CrawlEvent::PageFailed { exec_id, .. }
            | CrawlEvent::ItemsSaved { exec_id, .. }
            | CrawlEvent::ChildRecorded { exec_id, .. } => exec_id,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Consumer of crawl events
pub trait EventSink: Send + Sync {
    /// Handle one event; must not block
    fn emit(&self, event: CrawlEvent);
}

/// Writes every event as one structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::ExecutionStarted {
                exec_id,
                url,
                max_iterations,
            } => info!(%exec_id, %url, max_iterations, "execution started"),
            CrawlEvent::ExecutionFinished {
                exec_id,
                status,
                pages,
                items,
            } => info!(%exec_id, %status, pages, items, "execution finished"),
            CrawlEvent::PageStarted { exec_id, page, url } => {
                debug!(%exec_id, page, %url, "page started");
            }
            CrawlEvent::PageFetched {
                exec_id,
                page,
                status,
            } => debug!(%exec_id, page, status, "page fetched"),
            CrawlEvent::PaginationDetected { exec_id, style } => {
                info!(%exec_id, %style, "pagination detected");
            }
            CrawlEvent::PageRetried {
                exec_id,
                page,
                attempt,
                status,
                delay,
            } => warn!(
                %exec_id,
                page,
                attempt,
                status,
                delay_ms = delay.as_millis() as u64,
                "rate limited"
            ),
            CrawlEvent::PageFailed {
                exec_id,
                page,
                status,
                url,
            } => warn!(%exec_id, page, status, %url, "page failed"),
            CrawlEvent::ItemsSaved {
                exec_id,
                page,
                table,
                saved,
                failed,
            } => debug!(%exec_id, page, %table, saved, failed, "items saved"),
            CrawlEvent::ChildRecorded {
                exec_id,
                page,
                items,
                is_last,
            } => debug!(%exec_id, page, items, is_last, "child recorded"),
        }
    }
}

/// Forwards events over an unbounded channel
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<CrawlEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event);
    }
}
