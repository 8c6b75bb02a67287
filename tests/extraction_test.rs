//! End-to-end extraction tests against in-memory sources.

mod common;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use common::assertions::{assert_all_nan, assert_grids_identical, assert_row_eq};
use common::test_data;
use ncgrid::{
    extract, ElevationTarget, Envelope, ExtractOptions, ExtractRequest, NcGridError,
    ReadStrategy, StrategyPreference,
};

fn options(strategy: StrategyPreference) -> ExtractOptions {
    ExtractOptions {
        strategy,
        ..Default::default()
    }
}

fn hour(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, hour, 0, 0).unwrap()
}

#[test]
fn test_gradient_values_and_fill() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("temp", Envelope::new(-0.5, -0.5, 1.5, 1.5), 2, 2);

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_eq!(extraction.strategy, Some(ReadStrategy::Windowed));
    assert_eq!((extraction.width(), extraction.height()), (2, 2));
    // north row first
    assert_row_eq(
        &extraction.values,
        0,
        &[
            Some(test_data::gradient_value(91, 180)),
            Some(test_data::gradient_value(91, 181)),
        ],
    );
    assert_row_eq(&extraction.values, 1, &[None, Some(45100.5)]);
    assert_eq!(extraction.filled_cells, 3);
}

#[test]
fn test_strategies_produce_identical_grids() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("temp", Envelope::new(-40.0, -25.0, 35.0, 20.0), 50, 30);

    let windowed = extract(&source, &request, &options(StrategyPreference::Windowed)).unwrap();
    let pointwise = extract(&source, &request, &options(StrategyPreference::PointWise)).unwrap();

    assert_eq!(windowed.strategy, Some(ReadStrategy::Windowed));
    assert_eq!(pointwise.strategy, Some(ReadStrategy::PointWise));
    assert_grids_identical(&windowed.values, &pointwise.values);
    assert_eq!(windowed.filled_cells, pointwise.filled_cells);
}

#[test]
fn test_repeated_extraction_is_identical() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("temp", Envelope::new(-40.0, -25.0, 35.0, 20.0), 50, 30);

    for strategy in [StrategyPreference::Windowed, StrategyPreference::PointWise] {
        let first = extract(&source, &request, &options(strategy)).unwrap();
        let second = extract(&source, &request, &options(strategy)).unwrap();

        assert_eq!(first.strategy, second.strategy);
        assert_eq!(first.envelope, second.envelope);
        assert_eq!(first.filled_cells, second.filled_cells);
        assert_grids_identical(&first.values, &second.values);
    }
}

#[test]
fn test_auto_strategy_follows_threshold() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("temp", Envelope::world(), 36, 18);

    let small_window = extract(&source, &request, &ExtractOptions::default()).unwrap();
    assert_eq!(small_window.strategy, Some(ReadStrategy::Windowed));

    let low_threshold = ExtractOptions {
        window_threshold: 100,
        ..Default::default()
    };
    let sparse = extract(&source, &request, &low_threshold).unwrap();
    assert_eq!(sparse.strategy, Some(ReadStrategy::PointWise));

    assert_grids_identical(&small_window.values, &sparse.values);
}

#[test]
fn test_0_360_longitudes_are_shifted() {
    let source = test_data::global_0_360();
    let request = ExtractRequest::new("temp", Envelope::new(-10.0, -5.0, 10.0, 5.0), 10, 1);

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    let expected: Vec<Option<f32>> = [351, 353, 355, 357, 359, 1, 3, 5, 7, 9]
        .iter()
        .map(|v| Some(*v as f32))
        .collect();
    assert_row_eq(&extraction.values, 0, &expected);
}

#[test]
fn test_longitude_just_short_of_360_wraps_to_first_column() {
    let source = test_data::global_0_360();
    let request = ExtractRequest::new("temp", Envelope::new(-0.5, 0.0, 0.0, 1.0), 1, 1);

    for strategy in [StrategyPreference::Windowed, StrategyPreference::PointWise] {
        let extraction = extract(&source, &request, &options(strategy)).unwrap();
        assert_row_eq(&extraction.values, 0, &[Some(0.0)]);
    }
}

#[test]
fn test_descending_latitudes() {
    let source = test_data::descending();
    let request = ExtractRequest::new("temp", Envelope::new(0.0, 10.0, 2.0, 14.0), 2, 2);

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_row_eq(&extraction.values, 0, &[Some(13.0), Some(13.0)]);
    assert_row_eq(&extraction.values, 1, &[Some(11.0), Some(11.0)]);
}

#[test]
fn test_request_outside_coverage_is_empty() {
    let source = test_data::forecast();
    let request = ExtractRequest::new("temp", Envelope::new(40.0, 40.0, 50.0, 50.0), 4, 4);

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_all_nan(&extraction.values);
    assert_eq!(extraction.filled_cells, 0);
}

#[test]
fn test_empty_parameter_returns_empty_grid() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("", Envelope::new(-10.0, -10.0, 10.0, 10.0), 3, 2);

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_eq!(extraction.strategy, None);
    assert_eq!((extraction.width(), extraction.height()), (3, 2));
    assert_all_nan(&extraction.values);
}

#[test]
fn test_unknown_parameter() {
    let source = test_data::gradient();
    let request = ExtractRequest::new("salt", Envelope::world(), 4, 4);

    match extract(&source, &request, &ExtractOptions::default()) {
        Err(NcGridError::VariableNotFound { variable, source_id }) => {
            assert_eq!(variable, "salt");
            assert_eq!(source_id, "memory://gradient");
        }
        other => panic!("Expected VariableNotFound, got {:?}", other),
    }
}

fn forecast_request() -> ExtractRequest {
    ExtractRequest::new("temp", Envelope::new(-0.5, -0.5, 2.5, 2.5), 3, 3)
}

fn assert_forecast_grid(values: &ndarray::Array2<f32>, run: usize, time: usize) {
    for (row, lat) in [(0, 2), (1, 1), (2, 0)] {
        let expected: Vec<Option<f32>> = (0..3)
            .map(|lon| Some(test_data::forecast_value(run, time, lat, lon)))
            .collect();
        assert_row_eq(values, row, &expected);
    }
}

#[test]
fn test_forecast_defaults_to_latest_time() {
    let source = test_data::forecast();

    let extraction = extract(&source, &forecast_request(), &ExtractOptions::default()).unwrap();

    assert_forecast_grid(&extraction.values, 1, 2);
}

#[test]
fn test_swapped_bbox_corners_match_ordered_request() {
    let source = test_data::forecast();
    let swapped = ExtractRequest::new("temp", Envelope::new(2.5, 2.5, -0.5, -0.5), 3, 3);

    let extraction = extract(&source, &swapped, &ExtractOptions::default()).unwrap();

    assert_eq!(extraction.envelope, Envelope::new(-0.5, -0.5, 2.5, 2.5));
    assert_forecast_grid(&extraction.values, 1, 2);
}

#[test]
fn test_forecast_reference_time_without_time() {
    let source = test_data::forecast();
    let request = forecast_request().with_reference_time(hour(1, 0));

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_row_eq(&extraction.values, 0, &[Some(26.0), Some(27.0), Some(28.0)]);
    assert_row_eq(&extraction.values, 1, &[Some(23.0), Some(24.0), Some(25.0)]);
    assert_row_eq(&extraction.values, 2, &[Some(20.0), Some(21.0), Some(22.0)]);
}

#[test]
fn test_forecast_time_finds_its_run() {
    let source = test_data::forecast();
    let request = forecast_request().with_time(hour(2, 6));

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_forecast_grid(&extraction.values, 1, 1);
}

#[test]
fn test_forecast_surface_alias() {
    let source = test_data::forecast();
    let request = forecast_request()
        .with_time(hour(1, 6))
        .with_elevation(ElevationTarget::parse("SFC"));

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();

    assert_forecast_grid(&extraction.values, 0, 1);
}

#[test]
fn test_time_outside_requested_run() {
    let source = test_data::forecast();
    let request = forecast_request()
        .with_reference_time(hour(2, 0))
        .with_time(hour(1, 6));

    match extract(&source, &request, &ExtractOptions::default()) {
        Err(NcGridError::ValueNotMatched { variable, failures }) => {
            assert_eq!(variable, "temp");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].axis, "time");
            assert_eq!(failures[0].value, "2020-01-01T06:00:00.000Z");
        }
        other => panic!("Expected ValueNotMatched, got {:?}", other),
    }
}

#[test]
fn test_several_mismatches_are_reported_together() {
    let source = test_data::forecast();
    let request = forecast_request()
        .with_elevation(ElevationTarget::Value(5.0))
        .with_reference_time(hour(5, 0));

    let error = extract(&source, &request, &ExtractOptions::default()).unwrap_err();
    let message = error.to_string();

    match &error {
        NcGridError::ValueNotMatched { failures, .. } => {
            let axes: Vec<&str> = failures.iter().map(|f| f.axis.as_str()).collect();
            assert_eq!(axes, vec!["elevation", "reference time"]);
        }
        other => panic!("Expected ValueNotMatched, got {:?}", other),
    }
    assert!(message.contains("Requested elevation (5) not available."));
    assert!(message.contains("Requested reference time (2020-01-05T00:00:00.000Z) not available."));
}

#[test]
fn test_single_run_reference_time_from_tau() {
    let source = test_data::single_run_with_tau();
    let request = forecast_request()
        .with_reference_time(hour(1, 0))
        .with_time(hour(1, 0));

    let extraction = extract(&source, &request, &ExtractOptions::default()).unwrap();
    assert_row_eq(&extraction.values, 2, &[Some(0.0), Some(1.0), Some(2.0)]);

    let wrong_run = forecast_request().with_reference_time(hour(2, 0));
    assert!(matches!(
        extract(&source, &wrong_run, &ExtractOptions::default()),
        Err(NcGridError::ValueNotMatched { .. })
    ));
}
