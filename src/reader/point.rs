//! Point reader: one source access per needed cell.

use tracing::{debug, trace};

use super::{AxisAttributes, GridReader, IndexMap, ReadPlan};
use crate::error::Result;
use crate::grid::OutputGrid;
use crate::source::FileInspector;
use crate::strategy::ReadStrategy;

pub struct PointReader;

impl GridReader for PointReader {
    fn strategy(&self) -> ReadStrategy {
        ReadStrategy::PointWise
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
        debug!(
            variable = plan.variable(),
            reads = lon_map.len() * lat_map.len(),
            "Reading points"
        );

        let mut written = 0;
        for (lat_position, lat_index) in lat_map {
            for (column, lon_index) in lon_map {
                let index = plan.point_index(*lon_index, *lat_index);
                trace!(variable = plan.variable(), index = ?index, "Reading point");
                let raw = source.read_point(plan.variable(), &index)?;
                if let Some(value) = attributes.accept(raw) {
                    grid.set(*column, *lat_position, value);
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}
