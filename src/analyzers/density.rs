//! Spatial density aggregation for heatmap rendering.

use std::collections::HashMap;

use crate::analyzers::types::{DensityCell, DensityView, GeoPoint, WeightedPoint};
use crate::record::{Dataset, DeliveryRecord};

/// Default grid cell edge length in decimal degrees (roughly 550 m of
/// latitude at the equator).
pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.005;

/// Output shape of the density view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityMode {
    /// Bin records into fixed-resolution cells.
    Grid,
    /// Pass raw weighted points through for the renderer's own kernel.
    Points,
}

/// Options for density aggregation. `cell_size_deg` must be positive;
/// it is ignored in `Points` mode.
#[derive(Debug, Clone, Copy)]
pub struct DensityOptions {
    pub mode: DensityMode,
    pub cell_size_deg: f64,
}

impl Default for DensityOptions {
    fn default() -> Self {
        Self {
            mode: DensityMode::Grid,
            cell_size_deg: DEFAULT_CELL_SIZE_DEG,
        }
    }
}

/// Heat contribution of one record: package weight when present, else 1.0.
fn heat_weight(record: &DeliveryRecord) -> f64 {
    record.weight.unwrap_or(1.0)
}

/// Aggregates delivered points into a density view.
///
/// Grid mode sums heat weights per occupied cell; cells with no records
/// are omitted (sparse). Cells are sorted by descending intensity, ties
/// by cell index, so rendering priority is stable. Points mode preserves
/// input order.
pub fn aggregate_density(dataset: &Dataset, opts: DensityOptions) -> DensityView {
    match opts.mode {
        DensityMode::Points => DensityView::Points {
            points: dataset
                .records
                .iter()
                .map(|r| WeightedPoint {
                    point: GeoPoint {
                        lat: r.latitude,
                        lon: r.longitude,
                    },
                    weight: heat_weight(r),
                })
                .collect(),
        },
        DensityMode::Grid => {
            let res = opts.cell_size_deg;
            let mut bins: HashMap<(i64, i64), (f64, usize)> = HashMap::new();

            for record in &dataset.records {
                let cell = (
                    (record.latitude / res).floor() as i64,
                    (record.longitude / res).floor() as i64,
                );
                let bin = bins.entry(cell).or_insert((0.0, 0));
                bin.0 += heat_weight(record);
                bin.1 += 1;
            }

            let mut cells: Vec<DensityCell> = bins
                .into_iter()
                .map(|(cell, (intensity, record_count))| DensityCell {
                    cell,
                    center: GeoPoint {
                        lat: (cell.0 as f64 + 0.5) * res,
                        lon: (cell.1 as f64 + 0.5) * res,
                    },
                    intensity,
                    record_count,
                })
                .collect();

            cells.sort_by(|a, b| {
                b.intensity
                    .total_cmp(&a.intensity)
                    .then_with(|| a.cell.cmp(&b.cell))
            });

            DensityView::Grid {
                resolution_deg: res,
                cells,
            }
        }
    }
}
