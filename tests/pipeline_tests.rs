use std::collections::BTreeSet;

use chrono::NaiveDate;
use lastmile_analyzer::analyzers::correlation::{CorrelationOptions, aggregate_correlation};
use lastmile_analyzer::analyzers::density::{DensityOptions, aggregate_density};
use lastmile_analyzer::analyzers::flow::{FlowOptions, aggregate_flow};
use lastmile_analyzer::analyzers::types::VolumeBy;
use lastmile_analyzer::filter::{self, FilterSpec};
use lastmile_analyzer::ingest::{IngestReport, Region, ingest};
use lastmile_analyzer::layers::{export_correlation, export_density, export_flow};
use lastmile_analyzer::record::Dataset;
use lastmile_analyzer::schema::{AnalysisKind, TargetMetric};

static SAMPLE: &str = include_str!("fixtures/last_mile_sample.csv");

fn ingest_sample(kind: AnalysisKind) -> (Dataset, IngestReport) {
    ingest(SAMPLE.as_bytes(), kind, Region::default()).expect("fixture should ingest")
}

#[test]
fn test_ingest_report_accounting() {
    let (dataset, report) = ingest_sample(AnalysisKind::Flow);

    // 13 data rows: one bad latitude, one negative weight, one duplicate id
    assert_eq!(report.total, 13);
    assert_eq!(report.accepted, 10);
    assert_eq!(report.rejected, 3);
    assert_eq!(report.accepted + report.rejected, report.total);
    assert_eq!(dataset.len(), 10);

    // the Mumbai delivery is kept but flagged
    assert_eq!(report.flagged, 1);
    assert!(dataset.records.iter().any(|r| r.out_of_region));
}

#[test]
fn test_flow_pipeline_end_to_end() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);
    let filtered = filter::apply(&dataset, &FilterSpec::default());
    let view = aggregate_flow(&filtered, FlowOptions::default());

    // 5 (hub, customer) pairs; LM-1008 has no customer
    assert_eq!(view.groups.len(), 5);
    assert_eq!(view.without_customer, 1);
    assert_eq!(view.grouped_records, 9);

    // flow conservation
    let grouped: usize = view.groups.iter().map(|g| g.record_count).sum();
    assert_eq!(grouped, view.grouped_records);

    // descending volume, ties by hub then customer
    let keys: Vec<(&str, f64)> = view
        .groups
        .iter()
        .map(|g| (g.hub.as_str(), g.volume))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Whitefield", 4.0),
            ("Koramangala", 2.0),
            ("Koramangala", 1.0),
            ("Whitefield", 1.0),
            ("Yeshwanthpur", 1.0),
        ]
    );

    let layer = export_flow(&view);
    assert_eq!(layer.lines.len(), 5);
    assert_eq!(layer.lines[0].weight, 1.0);
    assert!(layer.lines.iter().all(|l| (0.0..=1.0).contains(&l.weight)));
}

#[test]
fn test_flow_weight_mode() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);
    let view = aggregate_flow(
        &dataset,
        FlowOptions {
            volume_by: VolumeBy::Weight,
        },
    );

    let whitefield_acme = view
        .groups
        .iter()
        .find(|g| g.hub == "Whitefield" && g.customer == "Acme Retail")
        .expect("group should exist");
    // LM-1001 + LM-1002 + LM-1009 + LM-1013
    assert!((whitefield_acme.volume - 34.7).abs() < 1e-9);
}

#[test]
fn test_hub_filter_preserves_conservation() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);
    let spec = FilterSpec {
        hubs: Some(BTreeSet::from(["Koramangala".to_string()])),
        ..FilterSpec::default()
    };

    let filtered = filter::apply(&dataset, &spec);
    assert_eq!(filtered.len(), 3);

    let view = aggregate_flow(&filtered, FlowOptions::default());
    assert_eq!(view.groups.len(), 2);
    let grouped: usize = view.groups.iter().map(|g| g.record_count).sum();
    assert_eq!(grouped, view.grouped_records);
    assert_eq!(grouped, 3);
}

#[test]
fn test_filter_identity_and_idempotence_on_ingested_data() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);

    let identity = filter::apply(&dataset, &FilterSpec::default());
    assert_eq!(identity, dataset);

    let spec = FilterSpec {
        vehicle_models: Some(BTreeSet::from(["Tata Ace".to_string()])),
        date_range: Some((
            NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 9).unwrap(),
        )),
        ..FilterSpec::default()
    };
    let once = filter::apply(&dataset, &spec);
    let twice = filter::apply(&once, &spec);
    assert_eq!(once, twice);

    // more restrictive filter never yields more rows
    let loose = FilterSpec {
        vehicle_models: Some(BTreeSet::from(["Tata Ace".to_string()])),
        ..FilterSpec::default()
    };
    assert!(once.len() <= filter::apply(&dataset, &loose).len());
}

#[test]
fn test_density_pipeline_conserves_weight() {
    let (dataset, _) = ingest_sample(AnalysisKind::Density);
    let view = aggregate_density(&dataset, DensityOptions::default());

    let total_weight: f64 = dataset.records.iter().filter_map(|r| r.weight).sum();
    assert!((view.total_intensity() - total_weight).abs() < 1e-9);
    assert_eq!(view.record_count(), dataset.len());

    let layer = export_density(&view);
    assert_eq!(layer.record_count, dataset.len());
    assert!(
        layer
            .marks
            .iter()
            .all(|m| (0.0..=1.0).contains(&m.intensity))
    );
}

#[test]
fn test_correlation_pipeline_end_to_end() {
    let (dataset, _) = ingest_sample(AnalysisKind::WeightDistance(TargetMetric::Weight));
    let view = aggregate_correlation(&dataset, CorrelationOptions::default());

    // LM-1006 has zero distance; every other accepted row qualifies
    assert_eq!(view.pairs.len(), 9);
    assert_eq!(view.zero_distance, 1);
    assert_eq!(view.skipped, 0);
    assert!(view.pearson.value().is_some());

    let layer = export_correlation(&view);
    assert_eq!(layer.points.len(), 9);
    assert_eq!(layer.record_count, 9);
    assert!(!layer.buckets.is_empty());
}

#[test]
fn test_earning_correlation() {
    let (dataset, _) = ingest_sample(AnalysisKind::WeightDistance(TargetMetric::Earning));
    let view = aggregate_correlation(
        &dataset,
        CorrelationOptions {
            metric: TargetMetric::Earning,
            ..CorrelationOptions::default()
        },
    );

    assert_eq!(view.pairs.len(), 9);
    // longer trips earn more in the sample; expect a clear positive trend
    let r = view.pearson.value().expect("coefficient defined");
    assert!(r > 0.5, "expected positive correlation, got {r}");
}

#[test]
fn test_empty_filter_result_flows_through_as_empty_layers() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);
    let spec = FilterSpec {
        hubs: Some(BTreeSet::from(["Nowhere".to_string()])),
        ..FilterSpec::default()
    };
    let filtered = filter::apply(&dataset, &spec);
    assert!(filtered.is_empty());

    let flow = export_flow(&aggregate_flow(&filtered, FlowOptions::default()));
    assert!(flow.is_empty());

    let density = export_density(&aggregate_density(&filtered, DensityOptions::default()));
    assert!(density.is_empty());

    let correlation =
        export_correlation(&aggregate_correlation(&filtered, CorrelationOptions::default()));
    assert!(correlation.is_empty());
    assert!(correlation.pearson.value().is_none());
}

#[test]
fn test_layers_serialize_to_json() {
    let (dataset, _) = ingest_sample(AnalysisKind::Flow);
    let layer = export_flow(&aggregate_flow(&dataset, FlowOptions::default()));

    let json = serde_json::to_value(&layer).expect("layer should serialize");
    assert_eq!(json["volume_by"], "count");
    assert_eq!(json["lines"].as_array().unwrap().len(), 5);
    assert!(json["lines"][0]["origin"]["lat"].is_number());
}
