//! Paginated fetch orchestrator
//!
//! `start` writes the parent record and returns at once; the crawl itself
//! runs as a detached, cancelable task that fetches pages strictly in
//! sequence and drives the execution log to a terminal status.

use super::events::{CrawlEvent, EventSink, TracingEventSink};
use super::registry::TaskRegistry;
use super::types::ExecutionSettings;
use crate::error::{Error, Result};
use crate::execution::{
    ChildExecutionRecord, ExecutionAck, ExecutionLogStore, ExecutionProgress, ExecutionRecord,
    ExecutionRequest, ExecutionStatus, SharedLogStore, UpstreamError,
};
use crate::http::{is_rate_limited, HttpClient, PageRequest};
use crate::pagination::{detect, merge_query_params, NextPageResolver, PaginationState};
use crate::sink::{BatchItemSaver, RequestContext, SharedSink};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

/// Starts crawls and owns their background tasks
#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<HttpClient>,
    log_store: SharedLogStore,
    sink: Option<SharedSink>,
    registry: Arc<TaskRegistry>,
    events: Arc<dyn EventSink>,
    settings: Arc<ExecutionSettings>,
}

impl Orchestrator {
    /// Create an orchestrator with default settings and tracing events
    pub fn new(client: HttpClient, log_store: SharedLogStore) -> Self {
        Self {
            client: Arc::new(client),
            log_store,
            sink: None,
            registry: Arc::new(TaskRegistry::new()),
            events: Arc::new(TracingEventSink),
            settings: Arc::new(ExecutionSettings::default()),
        }
    }

    /// Set the item sink used by requests with `saveData`
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the event consumer
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Set crawl settings
    #[must_use]
    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Share an existing task registry
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Task registry of this orchestrator
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Execution log store
    pub fn log_store(&self) -> &Arc<dyn ExecutionLogStore> {
        &self.log_store
    }

    /// Crawl settings
    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Start a crawl
    ///
    /// Fails without spawning anything when the request is invalid or the
    /// parent record cannot be written.
    pub async fn start(&self, request: ExecutionRequest) -> Result<ExecutionAck> {
        let url = request.validate()?;
        let max_iterations = request.effective_max_iterations(self.settings.default_max_iterations);
        let exec_id = Uuid::new_v4().to_string();

        let record = ExecutionRecord::new(&exec_id, request.clone());
        self.log_store.create_parent(&record).await?;

        let token = self.registry.register(&exec_id).await;
        let ack = ExecutionAck::from_record(&record, max_iterations);

        let this = self.clone();
        tokio::spawn(async move {
            this.run_detached(exec_id, request, url, max_iterations, token)
                .await;
        });

        Ok(ack)
    }

    /// Cancel a running crawl
    pub async fn cancel(&self, exec_id: &str) -> Result<bool> {
        self.registry.cancel(exec_id).await
    }

    /// Wait for a crawl to reach its terminal status
    pub async fn wait(&self, exec_id: &str) -> Result<ExecutionStatus> {
        self.registry.wait(exec_id).await
    }

    async fn run_detached(
        self,
        exec_id: String,
        request: ExecutionRequest,
        url: Url,
        max_iterations: u32,
        token: CancellationToken,
    ) {
        self.registry.mark_running(&exec_id).await;
        self.events.emit(CrawlEvent::ExecutionStarted {
            exec_id: exec_id.clone(),
            url: url.to_string(),
            max_iterations,
        });

        let mut state = PaginationState::new(url);
        let outcome = tokio::select! {
            result = AssertUnwindSafe(self.crawl(&exec_id, &request, max_iterations, &mut state))
                .catch_unwind() => result.unwrap_or_else(|panic| Err(panicked("crawl", &*panic))),
            () = token.cancelled() => Err(Error::Cancelled),
        };

        let status = match &outcome {
            Ok(()) if state.last_error.is_some() => ExecutionStatus::Error,
            Ok(()) => ExecutionStatus::Completed,
            Err(Error::Cancelled) => ExecutionStatus::Cancelled,
            Err(_) => ExecutionStatus::Error,
        };
        let fault = match &outcome {
            Err(Error::Cancelled) | Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };

        if fault.is_some() {
            error!(%exec_id, error = fault.as_deref(), "crawl aborted");
        }

        let finalized = AssertUnwindSafe(self.finalize(&exec_id, &state, status, fault.as_deref()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panicked("finalize", &*panic)));
        if let Err(e) = finalized {
            error!(%exec_id, error = %e, "failed to record terminal status");
        }

        self.events.emit(CrawlEvent::ExecutionFinished {
            exec_id: exec_id.clone(),
            status,
            pages: state.pages_recorded,
            items: state.total_items,
        });

        // Finished entries stay within the limit by the time waiters wake
        let pruned = self
            .registry
            .retain_finished(self.settings.finished_task_limit.saturating_sub(1))
            .await;
        if pruned > 0 {
            debug!(pruned, "dropped finished tasks from registry");
        }
        self.registry.mark_finished(&exec_id, status).await;
    }

    async fn finalize(
        &self,
        exec_id: &str,
        state: &PaginationState,
        status: ExecutionStatus,
        fault: Option<&str>,
    ) -> Result<()> {
        if state.last_error.is_some() || fault.is_some() {
            self.log_store
                .record_parent_failure(exec_id, state.last_error.as_ref(), fault)
                .await?;
        }
        self.log_store
            .update_parent_progress(exec_id, &progress_of(state))
            .await?;
        self.log_store
            .update_parent_status(exec_id, status, true)
            .await
    }

    async fn crawl(
        &self,
        exec_id: &str,
        request: &ExecutionRequest,
        max_iterations: u32,
        state: &mut PaginationState,
    ) -> Result<()> {
        self.log_store
            .update_parent_status(exec_id, ExecutionStatus::InProgress, false)
            .await?;

        let resolver = NextPageResolver::for_request(&state.url, &request.query_params);
        state.url = merge_query_params(&state.url, &request.query_params);

        let body = request.body.as_ref().filter(|_| request.method.sends_body());
        let saver = match (&self.sink, request.sink_table()) {
            (Some(sink), Some(table)) => Some((
                BatchItemSaver::with_batch_size(sink.clone(), self.settings.item_batch_size),
                table,
            )),
            _ => None,
        };
        let mut attempt = 0u32;

        while state.should_continue(max_iterations) {
            let page = state.page;
            self.events.emit(CrawlEvent::PageStarted {
                exec_id: exec_id.to_string(),
                page,
                url: state.url.to_string(),
            });

            let response = self
                .client
                .fetch(PageRequest {
                    method: request.method,
                    url: &state.url,
                    headers: &request.headers,
                    body,
                })
                .await?;
            self.events.emit(CrawlEvent::PageFetched {
                exec_id: exec_id.to_string(),
                page,
                status: response.status,
            });

            if response.is_error() {
                if is_rate_limited(response.status, &response.body) {
                    if let Some(delay) = self.settings.retry.next_delay(attempt) {
                        attempt += 1;
                        self.events.emit(CrawlEvent::PageRetried {
                            exec_id: exec_id.to_string(),
                            page,
                            attempt,
                            status: response.status,
                            delay,
                        });
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
                let failed_url = state.url.to_string();
                self.events.emit(CrawlEvent::PageFailed {
                    exec_id: exec_id.to_string(),
                    page,
                    status: response.status,
                    url: failed_url.clone(),
                });
                state.fail(UpstreamError::new(response.status, response.body, failed_url));
                break;
            }
            attempt = 0;

            if state.style.is_none() {
                let style = detect(&response.headers, &response.body);
                state.set_style(style);
                self.events.emit(CrawlEvent::PaginationDetected {
                    exec_id: exec_id.to_string(),
                    style,
                });
            }
            let style = state.style_or_none();

            let items = self.settings.extractor.extract(&response.body);
            state.add_items(items.len());

            let mut saved_items = 0;
            if let Some((saver, table)) = saver.as_ref().filter(|_| !items.is_empty()) {
                let context = RequestContext::for_page(request, &state.url);
                let report = saver
                    .save_page(table, &items, &context, response.status)
                    .await;
                saved_items = report.saved_ids.len();
                self.events.emit(CrawlEvent::ItemsSaved {
                    exec_id: exec_id.to_string(),
                    page,
                    table: (*table).to_string(),
                    saved: saved_items,
                    failed: report.failed.len(),
                });
            }

            let next = resolver.resolve(style, &state.url, &response.headers, &response.body);
            let is_last = next.is_done() || page >= max_iterations;

            if !items.is_empty() || is_last {
                let child = ChildExecutionRecord {
                    exec_id: exec_id.to_string(),
                    child_exec_id: Uuid::new_v4().to_string(),
                    iteration_no: page,
                    items_in_current_page: items.len(),
                    total_items_processed: state.total_items,
                    request_url: state.url.to_string(),
                    pagination_type: style,
                    response_status: response.status,
                    is_last,
                    item_ids: items.into_iter().map(|item| item.id).collect(),
                    saved_items,
                    timestamp: Utc::now(),
                };
                self.log_store.append_child(&child).await?;
                state.pages_recorded += 1;
                self.log_store
                    .update_parent_progress(exec_id, &progress_of(state))
                    .await?;
                self.events.emit(CrawlEvent::ChildRecorded {
                    exec_id: exec_id.to_string(),
                    page,
                    items: child.items_in_current_page,
                    is_last,
                });
            }

            state.apply(next);
            state.next_page();
        }

        Ok(())
    }
}

fn panicked(stage: &str, payload: &(dyn Any + Send)) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    Error::Other(format!("{stage} panicked: {message}"))
}

fn progress_of(state: &PaginationState) -> ExecutionProgress {
    ExecutionProgress {
        pages_processed: state.pages_recorded,
        total_items_processed: state.total_items,
        pagination_type: state.style,
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("has_sink", &self.sink.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
