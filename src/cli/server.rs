//! HTTP server mode
//!
//! `POST /execute/paginated` acknowledges immediately and leaves the crawl
//! running in the background; the remaining routes read the execution log
//! and the task registry.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::{Orchestrator, TaskSnapshot};
use crate::error::{Error, Result};
use crate::execution::{
    ChildExecutionRecord, ExecutionLogStore, ExecutionRecord, ExecutionRequest,
};

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    orchestrator: Orchestrator,
}

/// Success envelope of `POST /execute/paginated`
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    status: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            data,
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ErrorResponse {
    fn from_error(summary: &str, err: &Error) -> Self {
        Self {
            error: summary.to_string(),
            details: err.to_string(),
            code: Some(err.code()),
        }
    }

    fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Execution log of one crawl plus its live task state
#[derive(Debug, Serialize)]
struct ExecutionView {
    parent: ExecutionRecord,
    children: Vec<ChildExecutionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<TaskSnapshot>,
}

/// Build the application router
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = AppState { orchestrator };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/execute/paginated", post(execute_paginated))
        .route("/executions", get(list_executions))
        .route("/executions/:id", get(get_execution))
        .route("/executions/:id/cancel", post(cancel_execution))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(config: &ServerConfig, orchestrator: Orchestrator) -> Result<()> {
    let app = router(orchestrator);
    let addr = config.addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting HTTP server on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Start a paginated crawl
async fn execute_paginated(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ExecutionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ErrorResponse {
                error: "Invalid paginated request".to_string(),
                details: rejection.body_text(),
                code: Some("INVALID_REQUEST"),
            }
            .with_status(StatusCode::BAD_REQUEST);
        }
    };

    match state.orchestrator.start(request).await {
        Ok(ack) => (StatusCode::OK, Json(ApiResponse::ok(ack))).into_response(),
        Err(e) if e.is_client_error() => {
            ErrorResponse::from_error("Invalid paginated request", &e)
                .with_status(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start paginated execution");
            ErrorResponse::from_error("Failed to execute paginated request", &e)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Known background tasks
async fn list_executions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let executions = state.orchestrator.registry().list().await;
    Json(json!({ "executions": executions }))
}

/// Parent record, children and task state of one execution
async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let store = state.orchestrator.log_store();

    let parent = match store.get_parent(&id).await {
        Ok(Some(parent)) => parent,
        Ok(None) => {
            return ErrorResponse::from_error("Execution not found", &Error::not_found(&id))
                .with_status(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            return ErrorResponse::from_error("Failed to read execution log", &e)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let children = match store.list_children(&id).await {
        Ok(children) => children,
        Err(e) => {
            return ErrorResponse::from_error("Failed to read execution log", &e)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let task = state.orchestrator.registry().snapshot(&id).await;
    Json(ExecutionView {
        parent,
        children,
        task,
    })
    .into_response()
}

/// Request cancellation of a running crawl
async fn cancel_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.orchestrator.cancel(&id).await {
        Ok(cancelled) => Json(json!({
            "executionId": id,
            "cancelled": cancelled,
        }))
        .into_response(),
        Err(e @ Error::ExecutionNotFound { .. }) => {
            ErrorResponse::from_error("Execution not found", &e)
                .with_status(StatusCode::NOT_FOUND)
        }
        Err(e) => ErrorResponse::from_error("Failed to cancel execution", &e)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
