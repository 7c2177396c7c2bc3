//! HTTP request handlers for the key-value API
//!
//! Every handler is a thin translation layer: decode the request, call the
//! service, map the result. Errors are rendered as `{"error", "kind"}` with a
//! status derived from the error kind.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    Json as JsonExtractor,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use docstore_kv_core::system::metrics;
use docstore_kv_core::{Content, Error, ErrorKind, StoredValue, ValueRef, VERSION};

use super::api_server::ApiState;

/// Content type of the streamed scan response
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message naming the offending store or key where relevant
    pub error: String,
    /// Error kind (`NotFound`, `InvalidArgument`, `Internal`, `Fatal`)
    pub kind: String,
}

impl ErrorResponse {
    /// Create an error body of the given kind
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.as_str().to_string(),
        }
    }
}

/// Service error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

/// Status code for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Internal | ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        (status_for(kind), Json(ErrorResponse::new(kind, self.0.to_string()))).into_response()
    }
}

/// Set request body
#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    /// Value content; replaces any existing content entirely
    pub content: Content,
}

/// Scan query parameters
#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    /// Key prefix, matched literally; absent means every key
    #[serde(default)]
    pub prefix: String,
}

/// One line of a scan response
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanLine {
    /// Matching key
    pub key: String,
}

/// System health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `unavailable`
    pub status: String,
    /// Backend name
    pub backend: String,
    /// Server version
    pub version: String,
}

/// Custom JSON extractor that returns proper JSON error responses
pub struct JsonRequest<T>(pub T);

impl<T, S> axum::extract::FromRequest<S> for JsonRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        match JsonExtractor::<T>::from_request(req, state).await {
            Ok(JsonExtractor(value)) => Ok(JsonRequest(value)),
            Err(rejection) => {
                let error_message = match rejection {
                    JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON".to_string(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing or invalid Content-Type header. Expected 'application/json'".to_string()
                    }
                    JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
                    _ => "Invalid JSON request".to_string(),
                };

                warn!("JSON parsing error: {}", error_message);
                Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(ErrorKind::InvalidArgument, error_message)),
                ))
            }
        }
    }
}

/// Get the value stored under a key
pub async fn get_value(
    State(state): State<Arc<ApiState>>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<StoredValue>, ApiError> {
    let stored = state.service.get_value(&ValueRef::new(store, key)).await?;
    Ok(Json(stored))
}

/// Create or replace the value stored under a key
pub async fn set_value(
    State(state): State<Arc<ApiState>>,
    Path((store, key)): Path<(String, String)>,
    JsonRequest(request): JsonRequest<SetValueRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .set_value(&ValueRef::new(store, key), &request.content)
        .await?;
    Ok(Json(json!({})))
}

/// Delete a key; deleting an absent key succeeds
pub async fn delete_value(
    State(state): State<Arc<ApiState>>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_key(&ValueRef::new(store, key)).await?;
    Ok(Json(json!({})))
}

/// Stream the keys of a store matching a prefix as newline-delimited JSON.
///
/// The body is produced while the cursor is read. A failure after the first
/// line aborts the body; a client disconnect drops the stream and with it
/// the cursor.
pub async fn scan_keys(
    State(state): State<Arc<ApiState>>,
    Path(store): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Result<Response, ApiError> {
    debug!(store = %store, prefix = %query.prefix, "starting key scan");
    let keys = state.service.scan_keys(&store, &query.prefix).await?;

    let lines = keys.map(|item| {
        item.and_then(|key| {
            let mut line = serde_json::to_vec(&ScanLine { key })
                .map_err(|e| Error::internal(format!("failed to encode scan line: {}", e)))?;
            line.push(b'\n');
            Ok(Bytes::from(line))
        })
    });

    Ok(([(CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(lines)).into_response())
}

/// Health check, pinging the backend
pub async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let (status_code, status) = match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!("health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            backend: state.service.backend_name().to_string(),
            version: VERSION.to_string(),
        }),
    )
}

/// Prometheus metrics in the text exposition format
pub async fn metrics_handler(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    if !state.metrics_enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let text = metrics::render()?;
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response())
}
