//! Distance-to-metric correlation and binned trend averages.

use std::collections::BTreeMap;

use crate::analyzers::types::{CorrelationPair, CorrelationView, DistanceBucket, MetricValue};
use crate::analyzers::utility::pearson;
use crate::record::{Dataset, DeliveryRecord};
use crate::schema::TargetMetric;

/// Default width of the binned-average distance buckets, in kilometres.
pub const DEFAULT_BUCKET_WIDTH_KM: f64 = 5.0;

/// Options for the correlation view. `bucket_width_km` must be positive.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationOptions {
    pub metric: TargetMetric,
    pub bucket_width_km: f64,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            metric: TargetMetric::default(),
            bucket_width_km: DEFAULT_BUCKET_WIDTH_KM,
        }
    }
}

fn metric_value(record: &DeliveryRecord, metric: TargetMetric) -> Option<f64> {
    match metric {
        TargetMetric::Weight => record.weight,
        TargetMetric::Earning => record.earning,
    }
}

/// Pairs distance against the target metric for every qualifying record
/// and computes the Pearson coefficient plus binned averages.
///
/// Qualifying means both fields present, the metric non-negative, and
/// distance strictly positive; zero-distance records are counted apart
/// so they are never mistaken for dropped data. The coefficient is
/// `Unavailable` (never NaN) with fewer than two pairs or zero variance.
pub fn aggregate_correlation(dataset: &Dataset, opts: CorrelationOptions) -> CorrelationView {
    let mut pairs = Vec::new();
    let mut zero_distance = 0usize;
    let mut skipped = 0usize;

    for record in &dataset.records {
        match (record.distance_km, metric_value(record, opts.metric)) {
            (Some(d), Some(v)) if v >= 0.0 && d > 0.0 => {
                pairs.push(CorrelationPair {
                    distance_km: d,
                    value: v,
                });
            }
            (Some(d), Some(v)) if v >= 0.0 && d == 0.0 => zero_distance += 1,
            _ => skipped += 1,
        }
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.distance_km).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.value).collect();

    let coefficient = match pearson(&xs, &ys) {
        Some(r) => MetricValue::available(r),
        None if pairs.len() < 2 => MetricValue::unavailable("fewer than 2 qualifying pairs"),
        None => MetricValue::unavailable("zero variance in distance or metric"),
    };

    let buckets = bucket_averages(&pairs, opts.bucket_width_km);

    CorrelationView {
        metric: opts.metric,
        pairs,
        pearson: coefficient,
        buckets,
        zero_distance,
        skipped,
    }
}

/// Averages the metric per fixed-width distance bucket, ascending by
/// distance. Only occupied buckets are emitted.
fn bucket_averages(pairs: &[CorrelationPair], width_km: f64) -> Vec<DistanceBucket> {
    let mut bins: BTreeMap<i64, (f64, usize)> = BTreeMap::new();

    for pair in pairs {
        let idx = (pair.distance_km / width_km).floor() as i64;
        let bin = bins.entry(idx).or_insert((0.0, 0));
        bin.0 += pair.value;
        bin.1 += 1;
    }

    bins.into_iter()
        .map(|(idx, (sum, count))| DistanceBucket {
            lower_km: idx as f64 * width_km,
            upper_km: (idx + 1) as f64 * width_km,
            count,
            mean: sum / count as f64,
        })
        .collect()
}
