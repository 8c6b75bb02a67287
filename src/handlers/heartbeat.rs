//! Heartbeat endpoint handler.
//!
//! Returns server status: identity, uptime and the dataset being served.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::state::{AppState, Dataset};

/// Server ID, unique per process
static SERVER_ID: once_cell::sync::Lazy<String> =
    once_cell::sync::Lazy::new(|| Uuid::new_v4().to_string());

/// Server start time
static START_TIME: once_cell::sync::Lazy<SystemTime> = once_cell::sync::Lazy::new(SystemTime::now);

/// Heartbeat response structure
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub server_id: String,
    /// Current timestamp (ISO 8601 format)
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub dataset: DatasetInfo,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub identifier: String,
    /// `file` or `memory`
    pub kind: String,
    pub window_threshold: u64,
    pub strategy: String,
}

/// Mark the server start. Called once at startup so uptime counts from
/// launch rather than the first heartbeat.
pub fn touch_start_time() {
    once_cell::sync::Lazy::force(&START_TIME);
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let uptime = now
        .duration_since(*START_TIME)
        .unwrap_or(Duration::from_secs(0));

    Json(HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        dataset: dataset_info(&state),
        status: "healthy".to_string(),
    })
}

fn dataset_info(state: &AppState) -> DatasetInfo {
    let kind = match state.dataset {
        Dataset::File(_) => "file",
        Dataset::Memory(_) => "memory",
    };
    DatasetInfo {
        identifier: state.dataset.identifier(),
        kind: kind.to_string(),
        window_threshold: state.options.window_threshold,
        strategy: state.config.data.strategy.clone(),
    }
}
