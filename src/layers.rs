//! Renderer-agnostic output layers.
//!
//! Weight and intensity fields are min-max normalized to [0, 1] over the
//! current view only. Two exports of different filtered subsets are
//! independently scaled, so normalized values are not comparable across
//! exports. An empty upstream view exports as a layer with empty
//! sequences and a zero record count, never an error.

use serde::Serialize;

use crate::analyzers::types::{
    CorrelationView, DensityView, DistanceBucket, FlowView, GeoPoint, MetricValue, VolumeBy,
};
use crate::schema::TargetMetric;

/// Linear min-max scaler over one view's values. A degenerate span (all
/// values equal) maps everything to 1.0.
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn over(values: impl Iterator<Item = f64>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            min = min.min(v);
            max = max.max(v);
        }
        Self { min, max }
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.max <= self.min {
            1.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

/// One hub→customer line of a flow layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLine {
    pub hub: String,
    pub customer: String,
    pub origin: GeoPoint,
    pub dest: GeoPoint,
    /// Raw aggregated volume, for tooltips.
    pub volume: f64,
    /// Volume normalized to [0, 1] within this layer.
    pub weight: f64,
}

/// Flow lines ready for map rendering, ordered by rendering priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLayer {
    pub volume_by: VolumeBy,
    pub lines: Vec<FlowLine>,
    pub record_count: usize,
}

impl FlowLayer {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub fn export_flow(view: &FlowView) -> FlowLayer {
    let scale = MinMax::over(view.groups.iter().map(|g| g.volume));
    FlowLayer {
        volume_by: view.volume_by,
        lines: view
            .groups
            .iter()
            .map(|g| FlowLine {
                hub: g.hub.clone(),
                customer: g.customer.clone(),
                origin: g.origin,
                dest: g.dest,
                volume: g.volume,
                weight: scale.normalize(g.volume),
            })
            .collect(),
        record_count: view.grouped_records,
    }
}

/// Geometry carried by a density layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DensityShape {
    /// Marks are cell centers of a grid at this resolution.
    Cells { resolution_deg: f64 },
    /// Marks are raw delivery points.
    Points,
}

/// One heatmap mark: a point with normalized intensity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityMark {
    pub point: GeoPoint,
    /// Intensity normalized to [0, 1] within this layer.
    pub intensity: f64,
    /// Raw summed heat weight.
    pub raw: f64,
}

/// Heatmap marks ready for map rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityLayer {
    pub shape: DensityShape,
    pub marks: Vec<DensityMark>,
    pub record_count: usize,
}

impl DensityLayer {
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

pub fn export_density(view: &DensityView) -> DensityLayer {
    let (shape, raw_marks): (DensityShape, Vec<(GeoPoint, f64)>) = match view {
        DensityView::Grid {
            resolution_deg,
            cells,
        } => (
            DensityShape::Cells {
                resolution_deg: *resolution_deg,
            },
            cells.iter().map(|c| (c.center, c.intensity)).collect(),
        ),
        DensityView::Points { points } => (
            DensityShape::Points,
            points.iter().map(|p| (p.point, p.weight)).collect(),
        ),
    };

    let scale = MinMax::over(raw_marks.iter().map(|(_, raw)| *raw));
    DensityLayer {
        shape,
        marks: raw_marks
            .into_iter()
            .map(|(point, raw)| DensityMark {
                point,
                intensity: scale.normalize(raw),
                raw,
            })
            .collect(),
        record_count: view.record_count(),
    }
}

/// One scatter observation: x = distance (km), y = metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

/// Scatter points plus summary statistics for plot rendering. Axes stay
/// raw; only the summary is derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationLayer {
    pub metric: TargetMetric,
    pub points: Vec<ScatterPoint>,
    pub buckets: Vec<DistanceBucket>,
    pub pearson: MetricValue,
    pub record_count: usize,
    pub zero_distance: usize,
    pub skipped: usize,
}

impl CorrelationLayer {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn export_correlation(view: &CorrelationView) -> CorrelationLayer {
    CorrelationLayer {
        metric: view.metric,
        points: view
            .pairs
            .iter()
            .map(|p| ScatterPoint {
                x: p.distance_km,
                y: p.value,
            })
            .collect(),
        buckets: view.buckets.clone(),
        pearson: view.pearson.clone(),
        record_count: view.pairs.len(),
        zero_distance: view.zero_distance,
        skipped: view.skipped,
    }
}
