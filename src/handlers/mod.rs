//! HTTP request handlers for the ncgrid API.

pub mod coverage;
pub mod extract;
pub mod heartbeat;
pub mod metadata;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::NcGridError;
use crate::logging::create_http_trace_layer;
use crate::state::AppState;

pub use coverage::coverage_handler;
pub use extract::extract_handler;
pub use heartbeat::heartbeat_handler;
pub use metadata::metadata_handler;

/// All routes, bound to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/extract", get(extract_handler))
        .route("/coverage", get(coverage_handler))
        .route("/metadata", get(metadata_handler))
        .route("/heartbeat", get(heartbeat_handler))
        .layer(CorsLayer::permissive())
        .layer(create_http_trace_layer())
        .with_state(state)
}

/// JSON error body with the status the error maps to.
pub fn error_response(error: &NcGridError, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind(),
            "request_id": request_id
        })),
    )
        .into_response()
}

/// Run blocking source work off the async runtime.
pub(crate) async fn run_blocking<R, F>(f: F) -> crate::error::Result<R>
where
    F: FnOnce() -> crate::error::Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NcGridError::Server {
            message: format!("Blocking task failed: {}", e),
        })?
}
