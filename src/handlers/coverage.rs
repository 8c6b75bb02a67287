//! Coverage endpoint handler.
//!
//! Returns bounds, grid size, times, elevations and reference times of the
//! served file.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::{error_response, run_blocking};
use crate::coverage::describe;
use crate::logging::{generate_request_id, log_request_error};
use crate::state::AppState;

/// Handle GET /coverage requests
pub async fn coverage_handler(State(state): State<Arc<AppState>>) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    let result = run_blocking(move || {
        state
            .dataset
            .with_source(|source| describe(source, &state.options.axis_names))
    })
    .await;

    match result {
        Ok(summary) => {
            info!(
                endpoint = "/coverage",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                times = summary.times.len(),
                "Coverage request successful"
            );
            Json(summary).into_response()
        }
        Err(error) => {
            log_request_error(&error, "/coverage", &request_id, None);
            error_response(&error, &request_id)
        }
    }
}
