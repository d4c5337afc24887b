//! HTTP surface for the ingest runtime.
//!
//! # Endpoints
//!
//! - `POST /ingest` - Accepts one log record (200, or 400 on validation failure)
//! - `GET /data` - Up to 100 most recent durable records, newest first
//! - `GET /analytics` - Record count per server over the same window
//! - `POST /flush` - Writes all pending records now
//! - `GET /health` - Returns 200 if the server is running
//!
//! Records still pending a flush are not visible through `/data` or
//! `/analytics` until the next successful batch write.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hashbrown::HashMap;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::{
    core::analytics::server_counts,
    record::{LogRecord, RawRecord, ValidationError},
    runtime::handle::{IngestHandle, RuntimeError},
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    handle: IngestHandle,
}

impl AppState {
    /// Wraps a runtime handle.
    pub fn new(handle: IngestHandle) -> Self {
        Self { handle }
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body was not a JSON object of the expected shape.
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
    /// A field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading durable records failed.
    #[error("Failed to fetch data")]
    Query(#[source] RuntimeError),
    /// An operator flush reached the store and failed.
    #[error("flush failed: {0}")]
    Flush(#[source] RuntimeError),
    /// The ingest runtime is gone.
    #[error("ingest service unavailable")]
    Unavailable(#[source] RuntimeError),
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::InvalidJson(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidJson(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Flush(_) | ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(handle: IngestHandle) -> Router {
    Router::new()
        .route("/ingest", post(ingest_handler))
        .route("/data", get(data_handler))
        .route("/analytics", get(analytics_handler))
        .route("/flush", post(flush_handler))
        .route("/health", get(health_handler))
        .with_state(AppState::new(handle))
}

async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<RawRecord>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(raw) = payload?;
    match state.handle.accept(raw).await {
        Ok(ack) => {
            debug!(pending = ack.pending, flush = ?ack.flush, "Log received");
            Ok(Json(json!({ "message": "Log received." })))
        }
        Err(RuntimeError::Validation(err)) => {
            debug!(error = %err, "Rejected log record");
            Err(ApiError::Validation(err))
        }
        Err(err) => {
            error!(error = %err, "Ingest runtime unavailable");
            Err(ApiError::Unavailable(err))
        }
    }
}

async fn data_handler(State(state): State<AppState>) -> Result<Json<Vec<LogRecord>>, ApiError> {
    state.handle.recent().await.map(Json).map_err(|err| {
        error!(error = %err, "Failed to fetch data");
        ApiError::Query(err)
    })
}

async fn analytics_handler(
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, usize>>, ApiError> {
    let records = state.handle.recent().await.map_err(|err| {
        error!(error = %err, "Failed to fetch data");
        ApiError::Query(err)
    })?;
    Ok(Json(server_counts(&records)))
}

async fn flush_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.handle.flush().await {
        Ok(flushed) => Ok(Json(json!({ "flushed": flushed }))),
        Err(err @ RuntimeError::Store(_)) => {
            warn!(error = %err, "Operator flush failed");
            Err(ApiError::Flush(err))
        }
        Err(err) => Err(ApiError::Unavailable(err)),
    }
}

async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
