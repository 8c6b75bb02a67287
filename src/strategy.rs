//! Choice between one windowed read and many point reads.
//!
//! A windowed read fetches the whole bounding box of the needed file indices
//! in one call, which is cheap when the requested cells are dense in the
//! file. When the output is much coarser than the file the window is mostly
//! wasted, and reading each needed cell on its own wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::NcGridError;

/// Window size, in file cells, above which point reads are used.
pub const FILE_WINDOW_THRESHOLD: u64 = 200_000;

/// How the needed file cells are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStrategy {
    Windowed,
    PointWise,
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Windowed => write!(f, "windowed"),
            ReadStrategy::PointWise => write!(f, "pointwise"),
        }
    }
}

/// Caller override for the strategy choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    #[default]
    Auto,
    Windowed,
    PointWise,
}

impl FromStr for StrategyPreference {
    type Err = NcGridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(StrategyPreference::Auto),
            "windowed" | "window" => Ok(StrategyPreference::Windowed),
            "pointwise" | "point" => Ok(StrategyPreference::PointWise),
            other => Err(NcGridError::InvalidParameter {
                param: "strategy".to_string(),
                message: format!(
                    "Unknown read strategy '{}'. Expected auto, windowed or pointwise",
                    other
                ),
            }),
        }
    }
}

/// Span (max - min) of the file indices in a mapping.
fn span<K>(map: &BTreeMap<K, usize>) -> u64 {
    let mut values = map.values();
    let Some(first) = values.next() else {
        return 0;
    };
    let (min, max) = values.fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    (max - min) as u64
}

/// Number of file cells a window over the mapped indices would cover,
/// measured as the product of the two index spans.
pub fn window_points<K>(lon_map: &BTreeMap<K, usize>, lat_map: &BTreeMap<K, usize>) -> u64 {
    span(lon_map).saturating_mul(span(lat_map))
}

/// Pick the strategy for a request.
pub fn select<K>(
    lon_map: &BTreeMap<K, usize>,
    lat_map: &BTreeMap<K, usize>,
    threshold: u64,
    preference: StrategyPreference,
) -> ReadStrategy {
    let window = window_points(lon_map, lat_map);
    let requested = (lon_map.len() * lat_map.len()) as u64;
    let strategy = match preference {
        StrategyPreference::Windowed => ReadStrategy::Windowed,
        StrategyPreference::PointWise => ReadStrategy::PointWise,
        StrategyPreference::Auto if window > threshold => ReadStrategy::PointWise,
        StrategyPreference::Auto => ReadStrategy::Windowed,
    };

    debug!(
        window_points = window,
        requested_points = requested,
        sampling_factor = window as f64 / requested.max(1) as f64,
        threshold,
        strategy = %strategy,
        "Selected read strategy"
    );
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(usize, usize)]) -> BTreeMap<usize, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_small_window_is_read_whole() {
        let lon = map(&[(0, 10), (1, 20), (2, 30)]);
        let lat = map(&[(0, 5), (1, 6)]);
        assert_eq!(window_points(&lon, &lat), 20);
        assert_eq!(
            select(&lon, &lat, FILE_WINDOW_THRESHOLD, StrategyPreference::Auto),
            ReadStrategy::Windowed
        );
    }

    #[test]
    fn test_sparse_sampling_switches_to_points() {
        // 1000 x 500 file cells spanned by a 2 x 2 output
        let lon = map(&[(0, 0), (1, 1000)]);
        let lat = map(&[(0, 0), (1, 500)]);
        assert_eq!(window_points(&lon, &lat), 500_000);
        assert_eq!(
            select(&lon, &lat, FILE_WINDOW_THRESHOLD, StrategyPreference::Auto),
            ReadStrategy::PointWise
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let lon = map(&[(0, 0), (1, 400)]);
        let lat = map(&[(0, 0), (1, 500)]);
        assert_eq!(
            select(&lon, &lat, 200_000, StrategyPreference::Auto),
            ReadStrategy::Windowed
        );
        assert_eq!(
            select(&lon, &lat, 199_999, StrategyPreference::Auto),
            ReadStrategy::PointWise
        );
    }

    #[test]
    fn test_preference_overrides_threshold() {
        let lon = map(&[(0, 0), (1, 1000)]);
        let lat = map(&[(0, 0), (1, 1000)]);
        assert_eq!(
            select(&lon, &lat, FILE_WINDOW_THRESHOLD, StrategyPreference::Windowed),
            ReadStrategy::Windowed
        );
        assert_eq!(
            select(&map(&[]), &map(&[]), 0, StrategyPreference::PointWise),
            ReadStrategy::PointWise
        );
    }

    #[test]
    fn test_empty_maps_cover_nothing() {
        assert_eq!(window_points(&map(&[]), &map(&[(0, 3)])), 0);
    }

    #[test]
    fn test_parse_preference() {
        assert_eq!("AUTO".parse::<StrategyPreference>().unwrap(), StrategyPreference::Auto);
        assert_eq!(
            "pointwise".parse::<StrategyPreference>().unwrap(),
            StrategyPreference::PointWise
        );
        assert!("fastest".parse::<StrategyPreference>().is_err());
    }
}
