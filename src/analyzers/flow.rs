//! Hub→customer flow aggregation.

use std::collections::HashMap;

use crate::analyzers::types::{FlowGroup, FlowView, GeoPoint, VolumeBy};
use crate::analyzers::utility::mean;
use crate::record::Dataset;

/// Options for flow aggregation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowOptions {
    pub volume_by: VolumeBy,
}

#[derive(Default)]
struct GroupAccumulator {
    count: usize,
    weight_sum: f64,
    origin_lats: Vec<f64>,
    origin_lons: Vec<f64>,
    dest_lats: Vec<f64>,
    dest_lons: Vec<f64>,
}

/// Groups records by (hub, customer) and aggregates a volume per group.
///
/// Records without a customer cannot form a flow pair; they are counted
/// in `without_customer` and excluded from grouping. Endpoint coordinates
/// are group centroids, so the result does not depend on record order.
/// When no record in a group carries hub coordinates the origin falls
/// back to the delivered centroid, yielding a zero-length line.
pub fn aggregate_flow(dataset: &Dataset, opts: FlowOptions) -> FlowView {
    let mut groups: HashMap<(String, String), GroupAccumulator> = HashMap::new();
    let mut without_customer = 0usize;

    for record in &dataset.records {
        let Some(customer) = &record.customer else {
            without_customer += 1;
            continue;
        };

        let acc = groups
            .entry((record.hub.clone(), customer.clone()))
            .or_default();
        acc.count += 1;
        acc.weight_sum += record.weight.unwrap_or(0.0);
        acc.dest_lats.push(record.latitude);
        acc.dest_lons.push(record.longitude);
        if let (Some(lat), Some(lon)) = (record.hub_latitude, record.hub_longitude) {
            acc.origin_lats.push(lat);
            acc.origin_lons.push(lon);
        }
    }

    let grouped_records = dataset.len() - without_customer;

    let mut out: Vec<FlowGroup> = groups
        .into_iter()
        .map(|((hub, customer), acc)| {
            let dest = GeoPoint {
                lat: mean(&acc.dest_lats),
                lon: mean(&acc.dest_lons),
            };
            let origin = if acc.origin_lats.is_empty() {
                dest
            } else {
                GeoPoint {
                    lat: mean(&acc.origin_lats),
                    lon: mean(&acc.origin_lons),
                }
            };
            FlowGroup {
                hub,
                customer,
                record_count: acc.count,
                volume: match opts.volume_by {
                    VolumeBy::Count => acc.count as f64,
                    VolumeBy::Weight => acc.weight_sum,
                },
                origin,
                dest,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.volume
            .total_cmp(&a.volume)
            .then_with(|| a.hub.cmp(&b.hub))
            .then_with(|| a.customer.cmp(&b.customer))
    });

    FlowView {
        volume_by: opts.volume_by,
        groups: out,
        grouped_records,
        without_customer,
    }
}
