//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?query=<text>` | Text search; JSON array of products |
//! | `POST` | `/khoj` | Image search; multipart upload, `{dishes, products}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Successful searches carry an `x-total-hits` header with the engine's
//! total match count, which may exceed the number of products returned.
//! Image searches also carry `x-search-keyword`, the ingredient that was
//! searched, when it is a valid header value.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_dishes_detected", "message": "no dishes detected in image" } }
//! ```
//!
//! | Status | Codes |
//! |--------|-------|
//! | 400 | `bad_request` |
//! | 405 | `method_not_allowed` |
//! | 413 | `payload_too_large` |
//! | 422 | `no_dishes_detected`, `no_searchable_keyword` |
//! | 500 | `index_error` |
//! | 502 | `detection_failed` |
//! | 504 | `timeout` |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, MatchedPath, Multipart, Query, State,
    },
    http::{HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::Config;
use crate::error::KhojError;
use crate::pipeline::Pipeline;

const TOTAL_HITS_HEADER: &str = "x-total-hits";
const SEARCH_KEYWORD_HEADER: &str = "x-search-keyword";

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    /// Multipart field expected to carry the image.
    image_field: Arc<str>,
}

/// Starts the server with the HTTP detector and Elasticsearch index named
/// in `config`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    run_server_with_pipeline(config, Arc::new(pipeline)).await
}

/// Starts the server around an already-built [`Pipeline`], e.g. one with a
/// custom detector or an in-memory index.
pub async fn run_server_with_pipeline(
    config: &Config,
    pipeline: Arc<Pipeline>,
) -> anyhow::Result<()> {
    let app = router(config, pipeline);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        index = %config.index.name,
        detection = %config.detection.url,
        "khoj server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the application router.
pub fn router(config: &Config, pipeline: Arc<Pipeline>) -> Router {
    let state = AppState {
        pipeline,
        image_field: Arc::from(config.detection.field_name.as_str()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(TOTAL_HITS_HEADER),
            HeaderName::from_static(SEARCH_KEYWORD_HEADER),
        ]);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let path = request
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str)
                .unwrap_or(request.uri().path());
            tracing::info_span!("http_request", method = %request.method(), path = %path)
        })
        .on_request(|_request: &Request<_>, _span: &Span| {})
        .on_response(
            |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                let status = response.status().as_u16();
                if status >= 500 {
                    tracing::error!(
                        status = %status,
                        latency_ms = %latency.as_millis(),
                        "request failed with server error"
                    );
                } else {
                    tracing::info!(
                        status = %status,
                        latency_ms = %latency.as_millis(),
                        "request completed"
                    );
                }
            },
        );

    Router::new()
        .route("/search", get(handle_search).fallback(handle_method_not_allowed))
        .route("/khoj", post(handle_khoj).fallback(handle_method_not_allowed))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<KhojError> for AppError {
    fn from(err: KhojError) -> Self {
        let status = match &err {
            KhojError::Input(_) => StatusCode::BAD_REQUEST,
            KhojError::NoDishesDetected | KhojError::NoSearchableKeyword { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            KhojError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            KhojError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            KhojError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };

        if status.is_server_error() {
            tracing::error!(kind = ?err.kind(), error = %err, "search failed");
        } else {
            tracing::warn!(kind = ?err.kind(), error = %err, "search rejected");
        }

        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError {
            status,
            code: "payload_too_large".to_string(),
            message: "uploaded file is too large".to_string(),
        }
    } else {
        bad_request(format!("malformed multipart body: {}", err.body_text()))
    }
}

async fn handle_method_not_allowed() -> AppError {
    AppError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        code: "method_not_allowed".to_string(),
        message: "method not allowed".to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
}

/// Handler for `GET /search`. Responds with a bare JSON array of products.
async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) =
        params.map_err(|e| bad_request(format!("invalid query string: {}", e.body_text())))?;
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("query string parameter 'query' is required"))?;

    let result = state.pipeline.search_text(&query).await?;

    Ok((
        [(TOTAL_HITS_HEADER, result.total_hits.to_string())],
        Json(result.products),
    )
        .into_response())
}

// ============ POST /khoj ============

/// Handler for `POST /khoj`.
///
/// Takes the multipart field named after `detection.field_name`; if there is
/// none, the first field that carries a filename.
async fn handle_khoj(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart =
        multipart.map_err(|e| bad_request(format!("expected multipart/form-data: {}", e)))?;

    let mut image = None;
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_named = field.name() == Some(&*state.image_field);
        let is_file = field.file_name().is_some();
        if !is_named && (fallback.is_some() || !is_file) {
            continue;
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if is_named {
            image = Some(bytes);
            break;
        }
        fallback = Some(bytes);
    }

    let image = image
        .or(fallback)
        .ok_or_else(|| bad_request("multipart body contains no image file"))?;

    let response = state.pipeline.search_image(&image).await?;
    let keyword = response
        .keyword
        .as_deref()
        .and_then(|k| HeaderValue::from_str(k).ok());

    let mut http_response = (
        [(TOTAL_HITS_HEADER, response.total_hits.to_string())],
        Json(response),
    )
        .into_response();
    if let Some(keyword) = keyword {
        http_response.headers_mut().insert(SEARCH_KEYWORD_HEADER, keyword);
    }
    Ok(http_response)
}
