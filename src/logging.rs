//! Tracing setup and the structured events ncgrid emits.
//!
//! Every event carries the source identifier or file path it concerns so a
//! single NetCDF file can be followed through startup, extraction and errors.

use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Level};
use tracing_subscriber::EnvFilter;

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use uuid::Uuid;

use crate::error::{NcGridError, Result};

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
>;

/// One span per HTTP request, responses logged with millisecond latency.
pub fn create_http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

/// Install the global subscriber. `RUST_LOG` overrides `log_level`; a second
/// call is a no-op.
pub fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}

/// Record the startup check of the served file.
pub fn log_dataset_validation(path: &str, started: Instant, outcome: &Result<usize>) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok(variables) => info!(
            path = path,
            variables = *variables,
            elapsed_ms = elapsed_ms,
            "NetCDF file validated"
        ),
        Err(e) => error!(
            path = path,
            error = %e,
            error_kind = e.kind(),
            elapsed_ms = elapsed_ms,
            "NetCDF file failed validation"
        ),
    }
}

/// Run `f` inside a span named after `operation` and log how long it took.
pub fn in_timed_span<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = info_span!("timed", operation = operation);
    let started = Instant::now();
    let result = span.in_scope(f);
    debug!(
        operation = operation,
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Finished"
    );
    result
}

/// Log the outcome of a single grid extraction.
pub fn log_extraction_stats(
    source_id: &str,
    parameter: &str,
    strategy: &str,
    width: usize,
    height: usize,
    filled_cells: usize,
) {
    let cells = width.saturating_mul(height);
    let empty_cells = cells.saturating_sub(filled_cells);
    if filled_cells == 0 {
        warn!(
            source = source_id,
            parameter = parameter,
            strategy = strategy,
            width = width,
            height = height,
            "Extraction found no data inside the bounding box"
        );
        return;
    }
    info!(
        source = source_id,
        parameter = parameter,
        strategy = strategy,
        width = width,
        height = height,
        filled_cells = filled_cells,
        empty_cells = empty_cells,
        "Grid extracted"
    );
}

/// A source could not be opened or read outside any request.
pub fn log_source_error(source_id: &str, error: &NcGridError) {
    error!(
        source = source_id,
        error = %error,
        error_kind = error.kind(),
        "NetCDF source error"
    );
}

/// A request failed; client errors log at `warn`, server faults at `error`.
pub fn log_request_error(
    error: &NcGridError,
    endpoint: &str,
    request_id: &str,
    query: Option<&str>,
) {
    let query = query.unwrap_or("-");
    if error.status_code() < 500 {
        warn!(
            endpoint = endpoint,
            request_id = request_id,
            query = query,
            status = error.status_code(),
            error_kind = error.kind(),
            error = %error,
            "Request rejected"
        );
    } else {
        error!(
            endpoint = endpoint,
            request_id = request_id,
            query = query,
            status = error.status_code(),
            error_kind = error.kind(),
            error = %error,
            "Request failed"
        );
    }
}

/// Identifier echoed in error bodies and request logs.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
