//! Handler for the /extract endpoint.
//!
//! Extracts one parameter onto a `width` x `height` grid over a bounding box
//! and returns it as JSON or as an Apache Arrow IPC stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, Float32Array, Float64Array};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType, Field, Schema};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{error_response, run_blocking};
use crate::dimension::ElevationTarget;
use crate::error::{NcGridError, Result};
use crate::extract::{extract, ExtractOptions, ExtractRequest, Extraction};
use crate::grid::{Envelope, TargetGrid};
use crate::logging::{generate_request_id, log_request_error};
use crate::state::AppState;
use crate::strategy::{ReadStrategy, StrategyPreference};
use crate::time::parse_instant;

/// Query parameters for the extract endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractQuery {
    /// Variable to extract; empty returns an all-null grid
    #[serde(default)]
    pub parameter: String,
    /// `minLon,minLat,maxLon,maxLat`; the whole world when absent
    pub bbox: Option<String>,
    pub width: usize,
    pub height: usize,
    pub time: Option<String>,
    pub elevation: Option<String>,
    pub reference_time: Option<String>,
    /// `json` (default) or `arrow`
    pub format: Option<String>,
    /// Overrides the configured read strategy
    pub strategy: Option<String>,
}

/// JSON body of a successful extraction.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub parameter: String,
    pub envelope: Envelope,
    pub width: usize,
    pub height: usize,
    pub strategy: Option<ReadStrategy>,
    pub filled_cells: usize,
    /// Row-major, northern row first; null where no value exists
    pub values: Vec<Option<f32>>,
}

impl ExtractResponse {
    fn new(parameter: &str, extraction: &Extraction) -> Self {
        Self {
            parameter: parameter.to_string(),
            envelope: extraction.envelope,
            width: extraction.width(),
            height: extraction.height(),
            strategy: extraction.strategy,
            filled_cells: extraction.filled_cells,
            values: extraction
                .values
                .iter()
                .map(|v| (!v.is_nan()).then_some(*v))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Arrow,
}

fn output_format(format: Option<&str>) -> Result<OutputFormat> {
    match format.map(str::to_ascii_lowercase).as_deref() {
        None | Some("json") => Ok(OutputFormat::Json),
        Some("arrow") => Ok(OutputFormat::Arrow),
        Some(other) => Err(NcGridError::InvalidParameter {
            param: "format".to_string(),
            message: format!("Unsupported format: {}. Expected json or arrow", other),
        }),
    }
}

fn parse_time_param(param: &str, value: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            parse_instant(v).map_err(|_| NcGridError::InvalidParameter {
                param: param.to_string(),
                message: format!("Cannot parse '{}' as a timestamp", v),
            })
        })
        .transpose()
}

/// Build the engine request from query parameters.
pub fn parse_request(params: &ExtractQuery) -> Result<ExtractRequest> {
    let envelope = match params.bbox.as_deref() {
        Some(bbox) => Envelope::parse_bbox(bbox).ok_or_else(|| NcGridError::InvalidParameter {
            param: "bbox".to_string(),
            message: format!("Expected minLon,minLat,maxLon,maxLat, got '{}'", bbox),
        })?,
        None => Envelope::world(),
    };

    Ok(ExtractRequest {
        parameter: params.parameter.trim().to_string(),
        envelope,
        width: params.width,
        height: params.height,
        time: parse_time_param("time", params.time.as_deref())?,
        elevation: params
            .elevation
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(ElevationTarget::parse),
        reference_time: parse_time_param("reference_time", params.reference_time.as_deref())?,
    })
}

fn options_for(base: &ExtractOptions, strategy: Option<&str>) -> Result<ExtractOptions> {
    let mut options = base.clone();
    if let Some(strategy) = strategy {
        options.strategy = strategy.parse::<StrategyPreference>()?;
    }
    Ok(options)
}

/// Handle GET /extract requests
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExtractQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/extract",
        request_id = %request_id,
        parameter = %params.parameter,
        bbox = ?params.bbox,
        width = params.width,
        height = params.height,
        "Processing extract request"
    );

    let result = process_extract(state, &params).await;
    match result {
        Ok(response) => {
            info!(
                endpoint = "/extract",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Extract request successful"
            );
            response
        }
        Err(error) => {
            log_request_error(
                &error,
                "/extract",
                &request_id,
                Some(&format!("{:?}", params)),
            );
            error_response(&error, &request_id)
        }
    }
}

async fn process_extract(state: Arc<AppState>, params: &ExtractQuery) -> Result<Response> {
    let format = output_format(params.format.as_deref())?;
    let request = parse_request(params)?;
    let options = options_for(&state.options, params.strategy.as_deref())?;

    let parameter = request.parameter.clone();
    let extraction = run_blocking(move || {
        state
            .dataset
            .with_source(|source| extract(source, &request, &options))
    })
    .await?;

    match format {
        OutputFormat::Json => Ok(Json(ExtractResponse::new(&parameter, &extraction)).into_response()),
        OutputFormat::Arrow => {
            let body = Bytes::from(encode_arrow(&parameter, &extraction)?);
            Ok((
                StatusCode::OK,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/vnd.apache.arrow.stream"),
                )],
                body,
            )
                .into_response())
        }
    }
}

/// Encode an extraction as an Arrow IPC stream with one row per cell.
pub fn encode_arrow(parameter: &str, extraction: &Extraction) -> Result<Vec<u8>> {
    let (height, width) = extraction.values.dim();
    let centres = TargetGrid::new(&extraction.envelope, width, height);

    let mut lons = Vec::with_capacity(width * height);
    let mut lats = Vec::with_capacity(width * height);
    let mut values = Vec::with_capacity(width * height);
    for ((row, column), value) in extraction.values.indexed_iter() {
        lons.push(centres.lons[column]);
        lats.push(centres.lats[height - 1 - row]);
        values.push((!value.is_nan()).then_some(*value));
    }

    let conversion = |context: &str, e: &dyn std::fmt::Display| NcGridError::Conversion {
        message: format!("{}: {}", context, e),
    };

    let mut metadata = HashMap::new();
    metadata.insert("parameter".to_string(), parameter.to_string());
    metadata.insert("width".to_string(), width.to_string());
    metadata.insert("height".to_string(), height.to_string());
    metadata.insert(
        "envelope".to_string(),
        serde_json::to_string(&extraction.envelope)?,
    );
    if let Some(strategy) = extraction.strategy {
        metadata.insert("strategy".to_string(), strategy.to_string());
    }

    let schema = Arc::new(
        Schema::new(vec![
            Field::new("lon", DataType::Float64, false),
            Field::new("lat", DataType::Float64, false),
            Field::new("value", DataType::Float32, true),
        ])
        .with_metadata(metadata),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(lons)),
        Arc::new(Float64Array::from(lats)),
        Arc::new(Float32Array::from(values)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| conversion("Failed to create Arrow record batch", &e))?;

    let mut output = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut output, &schema)
            .map_err(|e| conversion("Failed to create Arrow IPC writer", &e))?;
        writer
            .write(&batch)
            .map_err(|e| conversion("Failed to write Arrow record batch", &e))?;
        writer
            .finish()
            .map_err(|e| conversion("Failed to finalize Arrow IPC stream", &e))?;
    }
    Ok(output)
}
