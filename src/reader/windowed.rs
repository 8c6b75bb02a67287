//! Windowed reader.
//!
//! Reads the rectangle spanned by the lowest and highest needed file indices
//! in a single call, then picks each needed sample out of that window.

use tracing::debug;

use super::{index_bounds, AxisAttributes, GridReader, IndexMap, RangeDisplay, ReadPlan};
use crate::error::Result;
use crate::grid::OutputGrid;
use crate::source::{AxisRange, FileInspector};
use crate::strategy::ReadStrategy;

/// One bulk read of the bounding file window.
pub struct WindowedReader;

impl GridReader for WindowedReader {
    fn strategy(&self) -> ReadStrategy {
        ReadStrategy::Windowed
    }

    fn fill(
        &self,
        source: &dyn FileInspector,
        plan: &ReadPlan,
        attributes: &AxisAttributes,
        lon_map: &IndexMap,
        lat_map: &IndexMap,
        grid: &mut OutputGrid,
    ) -> Result<usize> {
        let (Some((lon_min, lon_max)), Some((lat_min, lat_max))) =
            (index_bounds(lon_map), index_bounds(lat_map))
        else {
            debug!(variable = plan.variable(), "Nothing to read");
            return Ok(0);
        };

        let ranges = plan.ranges(
            AxisRange::inclusive(lon_min, lon_max),
            AxisRange::inclusive(lat_min, lat_max),
        );
        debug!(
            read = %RangeDisplay(plan.variable(), &ranges),
            "Reading window"
        );
        let window = source.read_window(plan.variable(), &ranges)?;

        let mut written = 0;
        for (lat_position, lat_index) in lat_map {
            for (column, lon_index) in lon_map {
                let offset: Vec<usize> = plan
                    .point_index(*lon_index, *lat_index)
                    .iter()
                    .zip(&ranges)
                    .map(|(index, range)| index - range.start)
                    .collect();
                let Some(raw) = window.get(offset.as_slice()) else {
                    continue;
                };
                if let Some(value) = attributes.accept(*raw) {
                    grid.set(*column, *lat_position, value);
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}
