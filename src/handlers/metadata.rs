//! Metadata endpoint handler.
//!
//! Returns JSON describing all variables, dimensions, and attributes of the served file.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{error_response, run_blocking};
use crate::logging::{generate_request_id, log_request_error};
use crate::source::FileInspector;
use crate::state::AppState;

/// Handle GET /metadata requests
pub async fn metadata_handler(State(state): State<Arc<AppState>>) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/metadata",
        request_id = %request_id,
        "Processing metadata request"
    );

    let result = run_blocking(move || {
        state
            .dataset
            .with_source(|source| Ok(source.metadata().clone()))
    })
    .await;

    match result {
        Ok(metadata) => {
            info!(
                endpoint = "/metadata",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                variable_count = metadata.variables.len(),
                dimension_count = metadata.dimensions.len(),
                "Metadata request successful"
            );
            Json(serde_json::json!({
                "global_attributes": metadata.global_attributes,
                "dimensions": metadata.dimensions,
                "variables": metadata.variables,
            }))
            .into_response()
        }
        Err(error) => {
            log_request_error(&error, "/metadata", &request_id, None);
            error_response(&error, &request_id)
        }
    }
}
