//! Test data generation utilities.
//!
//! In-memory sources with known value patterns, plus a forecast NetCDF file
//! writer when the `netcdf` feature is enabled.

use ncgrid::{AttributeValue, MemorySource, Variable};

pub const HOURS_SINCE_2020: &str = "hours since 2020-01-01 00:00:00";

/// Raw value written where the gradient fixture holds no data
pub const GRADIENT_FILL: f32 = -999.0;

fn text(value: &str) -> AttributeValue {
    AttributeValue::Text(value.to_string())
}

/// Evenly spaced coordinates.
pub fn degrees(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Global 1-degree grid in -180..179 / -90..90.
///
/// `temp(lat, lon)` holds `lat_idx * 1000 + lon_idx`, packed with
/// `scale_factor = 0.5` and `add_offset = 10`. The cell at lat 0, lon 0
/// (indices 90, 180) holds the fill value.
pub fn gradient() -> MemorySource {
    let lons = degrees(-180.0, 1.0, 360);
    let lats = degrees(-90.0, 1.0, 181);

    let mut values = Vec::with_capacity(lats.len() * lons.len());
    for lat_idx in 0..lats.len() {
        for lon_idx in 0..lons.len() {
            if lat_idx == 90 && lon_idx == 180 {
                values.push(GRADIENT_FILL);
            } else {
                values.push((lat_idx * 1000 + lon_idx) as f32);
            }
        }
    }

    let temp = Variable::new("temp", &["lat", "lon"], &[lats.len(), lons.len()])
        .with_attribute("scale_factor", AttributeValue::Number(0.5))
        .with_attribute("add_offset", AttributeValue::Number(10.0))
        .with_attribute("_FillValue", AttributeValue::Number(GRADIENT_FILL as f64))
        .with_attribute("units", text("K"));

    MemorySource::new("memory://gradient")
        .with_coordinate("lon", lons)
        .with_coordinate("lat", lats)
        .with_variable(temp, values)
        .expect("gradient fixture has a consistent shape")
}

/// Unpacked gradient value at the given file indices.
pub fn gradient_value(lat_idx: usize, lon_idx: usize) -> f32 {
    (lat_idx * 1000 + lon_idx) as f32 * 0.5 + 10.0
}

/// Global grid with longitudes 0..359; `temp(lat, lon)` holds `lon_idx`.
pub fn global_0_360() -> MemorySource {
    let lons = degrees(0.0, 1.0, 360);
    let lats = degrees(-90.0, 1.0, 181);
    let values: Vec<f32> = (0..lats.len())
        .flat_map(|_| (0..lons.len()).map(|lon_idx| lon_idx as f32))
        .collect();

    MemorySource::new("memory://global_0_360")
        .with_coordinate("lon", lons.clone())
        .with_coordinate("lat", lats.clone())
        .with_variable(
            Variable::new("temp", &["lat", "lon"], &[lats.len(), lons.len()]),
            values,
        )
        .expect("0..360 fixture has a consistent shape")
}

/// Global grid stored north to south; `temp(lat, lon)` holds the latitude.
pub fn descending() -> MemorySource {
    let lons = degrees(-180.0, 1.0, 360);
    let lats = degrees(90.0, -1.0, 181);
    let values: Vec<f32> = lats
        .iter()
        .flat_map(|lat| std::iter::repeat(*lat as f32).take(lons.len()))
        .collect();

    MemorySource::new("memory://descending")
        .with_coordinate("lon", lons.clone())
        .with_coordinate("lat", lats.clone())
        .with_variable(
            Variable::new("temp", &["lat", "lon"], &[lats.len(), lons.len()]),
            values,
        )
        .expect("descending fixture has a consistent shape")
}

/// Value of the forecast fixture at the given indices.
pub fn forecast_value(run: usize, time: usize, lat: usize, lon: usize) -> f32 {
    (run * 100 + time * 10 + lat * 3 + lon) as f32
}

/// Two model runs a day apart with three lead times each.
///
/// - `runtime`: 2020-01-01T00Z and 2020-01-02T00Z as strings
/// - `time(runtime, time)`: 0, 6, 12 and 24, 30, 36 hours since 2020-01-01
/// - `depth`: a single surface level
/// - `lat`, `lon`: 0, 1, 2
/// - `temp(runtime, time, depth, lat, lon)`: `run*100 + time*10 + lat*3 + lon`
pub fn forecast() -> MemorySource {
    let mut values = Vec::with_capacity(2 * 3 * 9);
    for run in 0..2 {
        for time in 0..3 {
            for lat in 0..3 {
                for lon in 0..3 {
                    values.push(forecast_value(run, time, lat, lon));
                }
            }
        }
    }

    MemorySource::new("memory://forecast")
        .with_strings(
            Variable::new("runtime", &["runtime"], &[2]),
            vec![
                "2020-01-01T00:00:00.000Z".to_string(),
                "2020-01-02T00:00:00.000Z".to_string(),
            ],
        )
        .expect("runtime strings match their dimension")
        .with_coordinate_variable(
            Variable::new("time", &["runtime", "time"], &[2, 3])
                .with_attribute("units", text(HOURS_SINCE_2020)),
            vec![0.0, 6.0, 12.0, 24.0, 30.0, 36.0],
        )
        .expect("time table has a consistent shape")
        .with_coordinate("depth", vec![0.0])
        .with_coordinate("lat", vec![0.0, 1.0, 2.0])
        .with_coordinate("lon", vec![0.0, 1.0, 2.0])
        .with_variable(
            Variable::new("temp", &["runtime", "time", "depth", "lat", "lon"], &[2, 3, 1, 3, 3]),
            values,
        )
        .expect("forecast fixture has a consistent shape")
}

/// A single run whose reference time is only known from the tau variable.
///
/// `temp(time, lat, lon)` holds `time*10 + lat*3 + lon` over times 0 and 6
/// hours since 2020-01-01.
pub fn single_run_with_tau() -> MemorySource {
    let values: Vec<f32> = (0..2)
        .flat_map(|t| (0..9).map(move |cell| (t * 10 + cell) as f32))
        .collect();

    MemorySource::new("memory://tau")
        .with_coordinate_variable(
            Variable::new("time", &["time"], &[2]).with_attribute("units", text(HOURS_SINCE_2020)),
            vec![0.0, 6.0],
        )
        .expect("time axis has a consistent shape")
        .with_coordinate_variable(
            Variable::new("tau", &["time"], &[2])
                .with_attribute("time_origin", text("2020-01-01 00:00:00")),
            vec![0.0, 6.0],
        )
        .expect("tau axis has a consistent shape")
        .with_coordinate("lat", vec![0.0, 1.0, 2.0])
        .with_coordinate("lon", vec![0.0, 1.0, 2.0])
        .with_variable(Variable::new("temp", &["time", "lat", "lon"], &[2, 3, 3]), values)
        .expect("tau fixture has a consistent shape")
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_files::*;

#[cfg(feature = "netcdf")]
mod netcdf_files {
    use std::path::Path;

    use super::HOURS_SINCE_2020;

    type Result<T> = std::result::Result<T, netcdf::Error>;

    pub const FORECAST_FILL: i16 = -32767;

    /// Raw packed value of the forecast file; the fill sits at run 1,
    /// time 1, lat index 1, lon index 3.
    pub fn forecast_raw(run: usize, time: usize, lat: usize, lon: usize) -> i16 {
        if (run, time, lat, lon) == (1, 1, 1, 3) {
            return FORECAST_FILL;
        }
        (run * 1000 + time * 100 + lat * 10 + lon) as i16
    }

    /// Write a two-run forecast file.
    ///
    /// - `runtime`: 0 and 24 hours since 2020-01-01
    /// - `time(runtime, time)`: 0, 6 and 24, 30
    /// - `depth`: 0
    /// - `lat`: 10, 9, 8 (north to south)
    /// - `lon`: 0, 90, 180, 270
    /// - `temp`: packed shorts, `scale_factor = 0.5`, `add_offset = 100`
    pub fn create_forecast_nc(path: &Path) -> Result<()> {
        let mut file = netcdf::create(path)?;

        file.add_dimension("runtime", 2)?;
        file.add_dimension("time", 2)?;
        file.add_dimension("depth", 1)?;
        file.add_dimension("lat", 3)?;
        file.add_dimension("lon", 4)?;

        file.add_attribute("title", "Forecast Test Data")?;

        {
            let mut runtime = file.add_variable::<f64>("runtime", &["runtime"])?;
            runtime.put_attribute("units", HOURS_SINCE_2020)?;
            runtime.put_values(&[0.0f64, 24.0], &[..])?;
        }
        {
            let mut time = file.add_variable::<f64>("time", &["runtime", "time"])?;
            time.put_attribute("units", HOURS_SINCE_2020)?;
            time.put_values(&[0.0f64, 6.0, 24.0, 30.0], &[.., ..])?;
        }
        {
            let mut depth = file.add_variable::<f32>("depth", &["depth"])?;
            depth.put_attribute("units", "m")?;
            depth.put_values(&[0.0f32], &[..])?;
        }
        {
            let mut lat = file.add_variable::<f32>("lat", &["lat"])?;
            lat.put_attribute("units", "degrees_north")?;
            lat.put_values(&[10.0f32, 9.0, 8.0], &[..])?;
        }
        {
            let mut lon = file.add_variable::<f32>("lon", &["lon"])?;
            lon.put_attribute("units", "degrees_east")?;
            lon.put_values(&[0.0f32, 90.0, 180.0, 270.0], &[..])?;
        }

        let mut values = Vec::with_capacity(2 * 2 * 3 * 4);
        for run in 0..2 {
            for time in 0..2 {
                for lat in 0..3 {
                    for lon in 0..4 {
                        values.push(forecast_raw(run, time, lat, lon));
                    }
                }
            }
        }
        {
            let mut temp =
                file.add_variable::<i16>("temp", &["runtime", "time", "depth", "lat", "lon"])?;
            temp.put_attribute("_FillValue", FORECAST_FILL)?;
            temp.put_attribute("scale_factor", 0.5f32)?;
            temp.put_attribute("add_offset", 100.0f32)?;
            temp.put_attribute("units", "degC")?;
            temp.put_values(values.as_slice(), &[.., .., .., .., ..])?;
        }

        Ok(())
    }

    /// Unpacked value of the forecast file.
    pub fn forecast_unpacked(run: usize, time: usize, lat: usize, lon: usize) -> f32 {
        forecast_raw(run, time, lat, lon) as f32 * 0.5 + 100.0
    }
}
