//! Output grid construction.
//!
//! A request envelope is subdivided into `width` x `height` uniform cells.
//! The cell centres are the coordinates sampled from the file, and the
//! output raster holds one value per cell, NaN until a reader fills it.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Envelope {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// The whole world in -180..180 / -90..90.
    pub fn world() -> Self {
        Self::new(MIN_LONGITUDE, MIN_LATITUDE, MAX_LONGITUDE, MAX_LATITUDE)
    }

    /// Order each axis so min <= max, then clamp to world bounds.
    pub fn clamped(&self) -> Self {
        let (west, east) = ordered(self.min_lon, self.max_lon);
        let (south, north) = ordered(self.min_lat, self.max_lat);
        Self {
            min_lon: west.clamp(MIN_LONGITUDE, MAX_LONGITUDE),
            min_lat: south.clamp(MIN_LATITUDE, MAX_LATITUDE),
            max_lon: east.clamp(MIN_LONGITUDE, MAX_LONGITUDE),
            max_lat: north.clamp(MIN_LATITUDE, MAX_LATITUDE),
        }
    }

    /// Parse `minLon,minLat,maxLon,maxLat`.
    pub fn parse_bbox(text: &str) -> Option<Self> {
        let values: Vec<f64> = text
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Some(Self::new(*min_lon, *min_lat, *max_lon, *max_lat))
            }
            _ => None,
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Cell-centre coordinates sampled for each output column and row.
///
/// `lats[0]` is the southernmost row centre.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
}

impl TargetGrid {
    pub fn new(envelope: &Envelope, width: usize, height: usize) -> Self {
        Self {
            lons: cell_centres(envelope.min_lon, envelope.max_lon, width),
            lats: cell_centres(envelope.min_lat, envelope.max_lat, height),
        }
    }
}

fn cell_centres(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let span = (max - min) / count as f64;
    (0..count)
        .map(|i| min + span * i as f64 + span / 2.0)
        .collect()
}

/// The output raster of one extraction.
#[derive(Debug, Clone)]
pub struct OutputGrid {
    envelope: Envelope,
    target: TargetGrid,
    values: Array2<f32>,
}

impl OutputGrid {
    /// Clamp `envelope`, derive the target grid and allocate an all-NaN raster.
    pub fn new(envelope: &Envelope, width: usize, height: usize) -> Self {
        let envelope = envelope.clamped();
        Self {
            target: TargetGrid::new(&envelope, width, height),
            values: Array2::from_elem((height, width), f32::NAN),
            envelope,
        }
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn target(&self) -> &TargetGrid {
        &self.target
    }

    /// Store a value for output column `column` and latitude position
    /// `lat_position` (0 = south). Row 0 of the raster is the north edge.
    pub fn set(&mut self, column: usize, lat_position: usize, value: f32) {
        let height = self.height();
        if lat_position >= height || column >= self.width() {
            return;
        }
        let row = height - 1 - lat_position;
        trace!(column, row, value, "Writing grid cell");
        self.values[[row, column]] = value;
    }

    /// Number of cells holding a value.
    pub fn filled_cells(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn into_parts(self) -> (Array2<f32>, Envelope) {
        (self.values, self.envelope)
    }
}
