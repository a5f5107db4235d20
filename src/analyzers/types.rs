//! Data types produced by the aggregation pipeline.

use serde::Serialize;

use crate::schema::TargetMetric;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A statistic that is either a real number or explicitly not available.
///
/// Keeps "no data" distinguishable from a value of zero; downstream
/// consumers never see NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricValue {
    Available { value: f64 },
    Unavailable { reason: String },
}

impl MetricValue {
    pub fn available(value: f64) -> Self {
        MetricValue::Available { value }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        MetricValue::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Available { value } => Some(*value),
            MetricValue::Unavailable { .. } => None,
        }
    }
}

/// Volume measure for a flow group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBy {
    /// Number of records in the group.
    Count,
    /// Sum of the group's package weights.
    Weight,
}

impl Default for VolumeBy {
    fn default() -> Self {
        VolumeBy::Count
    }
}

/// One (hub, customer) group in a flow view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGroup {
    pub hub: String,
    pub customer: String,
    pub record_count: usize,
    pub volume: f64,
    /// Centroid of the group's hub coordinates.
    pub origin: GeoPoint,
    /// Centroid of the group's delivered coordinates.
    pub dest: GeoPoint,
}

/// Aggregated hub→customer flows, sorted by descending volume (ties by
/// hub then customer, lexicographic).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowView {
    pub volume_by: VolumeBy,
    pub groups: Vec<FlowGroup>,
    /// Records that entered a group.
    pub grouped_records: usize,
    /// Aggregate-only records with no customer, excluded from grouping.
    pub without_customer: usize,
}

/// One occupied cell of the density grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCell {
    /// Grid index (floor of lat/resolution, lon/resolution).
    pub cell: (i64, i64),
    pub center: GeoPoint,
    pub intensity: f64,
    pub record_count: usize,
}

/// A raw delivery point with its heat weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPoint {
    pub point: GeoPoint,
    pub weight: f64,
}

/// Spatial density, either binned into sparse grid cells or passed
/// through as weighted points for renderer-side kernel smoothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DensityView {
    Grid {
        resolution_deg: f64,
        cells: Vec<DensityCell>,
    },
    Points {
        points: Vec<WeightedPoint>,
    },
}

impl DensityView {
    pub fn record_count(&self) -> usize {
        match self {
            DensityView::Grid { cells, .. } => cells.iter().map(|c| c.record_count).sum(),
            DensityView::Points { points } => points.len(),
        }
    }

    pub fn total_intensity(&self) -> f64 {
        match self {
            DensityView::Grid { cells, .. } => cells.iter().map(|c| c.intensity).sum(),
            DensityView::Points { points } => points.iter().map(|p| p.weight).sum(),
        }
    }
}

/// One qualifying (distance, metric) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub distance_km: f64,
    pub value: f64,
}

/// Average of the metric over one fixed-width distance bucket. Empty
/// buckets are omitted from the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceBucket {
    pub lower_km: f64,
    pub upper_km: f64,
    pub count: usize,
    pub mean: f64,
}

/// Distance-to-metric relationship over the filtered dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationView {
    pub metric: TargetMetric,
    pub pairs: Vec<CorrelationPair>,
    pub pearson: MetricValue,
    pub buckets: Vec<DistanceBucket>,
    /// Otherwise-qualifying records excluded for zero distance.
    pub zero_distance: usize,
    /// Records missing the distance or metric field, or with a negative
    /// metric.
    pub skipped: usize,
}
