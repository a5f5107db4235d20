//! CLI entry point for the last-mile network analyzer.
//!
//! Provides subcommands that run the analysis pipeline (ingest, filter,
//! aggregate, export) over a delivery CSV export and emit a
//! renderer-ready JSON layer.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use lastmile_analyzer::analyzers::correlation::{
    CorrelationOptions, DEFAULT_BUCKET_WIDTH_KM, aggregate_correlation,
};
use lastmile_analyzer::analyzers::density::{
    DEFAULT_CELL_SIZE_DEG, DensityMode, DensityOptions, aggregate_density,
};
use lastmile_analyzer::analyzers::flow::{FlowOptions, aggregate_flow};
use lastmile_analyzer::analyzers::types::VolumeBy;
use lastmile_analyzer::filter::{self, FilterSpec};
use lastmile_analyzer::ingest::{Region, ingest};
use lastmile_analyzer::layers::{export_correlation, export_density, export_flow};
use lastmile_analyzer::record::Dataset;
use lastmile_analyzer::schema::{AnalysisKind, TargetMetric};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "lastmile_analyzer")]
#[command(about = "Analyze last-mile delivery networks from trip CSV exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Filter flags shared by every analysis subcommand. A flag left unset
/// places no restriction on that dimension.
#[derive(Args)]
struct FilterArgs {
    /// Keep only these hubs (repeatable)
    #[arg(long = "hub")]
    hubs: Vec<String>,

    /// Keep only these customers (repeatable)
    #[arg(long = "customer")]
    customers: Vec<String>,

    /// Keep only these vehicle models (repeatable)
    #[arg(long = "vehicle-model")]
    vehicle_models: Vec<String>,

    /// Minimum package weight, inclusive
    #[arg(long)]
    min_weight: Option<f64>,

    /// Maximum package weight, inclusive
    #[arg(long)]
    max_weight: Option<f64>,

    /// Start of the date range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of the date range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_spec(&self) -> FilterSpec {
        fn set(values: &[String]) -> Option<BTreeSet<String>> {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().cloned().collect())
            }
        }

        let weight_range = match (self.min_weight, self.max_weight) {
            (None, None) => None,
            (min, max) => Some((min.unwrap_or(0.0), max.unwrap_or(f64::INFINITY))),
        };
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some((
                from.unwrap_or(NaiveDate::MIN),
                to.unwrap_or(NaiveDate::MAX),
            )),
        };

        FilterSpec {
            hubs: set(&self.hubs),
            customers: set(&self.customers),
            vehicle_models: set(&self.vehicle_models),
            weight_range,
            date_range,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate hub→customer flow volumes into a flow-line layer
    Flow {
        /// Path to the delivery CSV export
        #[arg(value_name = "FILE")]
        input: String,

        /// Volume measure per (hub, customer) group: "count" or "weight"
        #[arg(long, default_value = "count")]
        volume_by: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the JSON layer here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Bin deliveries into a spatial density layer for heatmap rendering
    Density {
        /// Path to the delivery CSV export
        #[arg(value_name = "FILE")]
        input: String,

        /// Output shape: "grid" (binned cells) or "points" (raw weighted points)
        #[arg(long, default_value = "grid")]
        mode: String,

        /// Grid cell edge length in decimal degrees
        #[arg(long, default_value_t = DEFAULT_CELL_SIZE_DEG)]
        cell_size: f64,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the JSON layer here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compute the distance-to-weight (or earning) relationship
    Correlation {
        /// Path to the delivery CSV export
        #[arg(value_name = "FILE")]
        input: String,

        /// Target metric paired with distance: "weight" or "earning"
        #[arg(long, default_value = "weight")]
        metric: String,

        /// Distance bucket width in kilometres for binned averages
        #[arg(long, default_value_t = DEFAULT_BUCKET_WIDTH_KM)]
        bucket_width: f64,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write the JSON layer here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/lastmile_analyzer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("lastmile_analyzer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Flow {
            input,
            volume_by,
            filters,
            output,
        } => {
            let volume_by = match volume_by.as_str() {
                "count" => VolumeBy::Count,
                "weight" => VolumeBy::Weight,
                other => bail!("unknown volume measure '{other}' (expected count or weight)"),
            };

            let filtered = load_filtered(&input, AnalysisKind::Flow, &filters)?;
            let view = aggregate_flow(&filtered, FlowOptions { volume_by });
            let layer = export_flow(&view);
            if layer.is_empty() {
                warn!("flow layer is empty after filtering");
            }
            info!(
                groups = layer.lines.len(),
                records = layer.record_count,
                without_customer = view.without_customer,
                "Flow layer ready"
            );
            write_layer(&layer, output.as_deref())
        }
        Commands::Density {
            input,
            mode,
            cell_size,
            filters,
            output,
        } => {
            let mode = match mode.as_str() {
                "grid" => DensityMode::Grid,
                "points" => DensityMode::Points,
                other => bail!("unknown density mode '{other}' (expected grid or points)"),
            };
            if cell_size <= 0.0 {
                bail!("cell size must be positive, got {cell_size}");
            }

            let filtered = load_filtered(&input, AnalysisKind::Density, &filters)?;
            let view = aggregate_density(
                &filtered,
                DensityOptions {
                    mode,
                    cell_size_deg: cell_size,
                },
            );
            let layer = export_density(&view);
            if layer.is_empty() {
                warn!("density layer is empty after filtering");
            }
            info!(
                marks = layer.marks.len(),
                records = layer.record_count,
                "Density layer ready"
            );
            write_layer(&layer, output.as_deref())
        }
        Commands::Correlation {
            input,
            metric,
            bucket_width,
            filters,
            output,
        } => {
            let metric = match metric.as_str() {
                "weight" => TargetMetric::Weight,
                "earning" => TargetMetric::Earning,
                other => bail!("unknown metric '{other}' (expected weight or earning)"),
            };
            if bucket_width <= 0.0 {
                bail!("bucket width must be positive, got {bucket_width}");
            }

            let filtered = load_filtered(&input, AnalysisKind::WeightDistance(metric), &filters)?;
            let view = aggregate_correlation(
                &filtered,
                CorrelationOptions {
                    metric,
                    bucket_width_km: bucket_width,
                },
            );
            let layer = export_correlation(&view);
            if layer.is_empty() {
                warn!("correlation layer has no qualifying pairs");
            }
            info!(
                pairs = layer.record_count,
                zero_distance = layer.zero_distance,
                skipped = layer.skipped,
                "Correlation layer ready"
            );
            write_layer(&layer, output.as_deref())
        }
    }
}

/// Ingests the CSV for `kind` and applies the requested filters.
///
/// Row-level rejections are logged and carried in the report; only a
/// schema-level failure aborts.
fn load_filtered(path: &str, kind: AnalysisKind, filters: &FilterArgs) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("cannot open input file {path}"))?;
    let (dataset, report) =
        ingest(file, kind, Region::default()).with_context(|| format!("ingestion of {path} failed"))?;

    info!(
        total = report.total,
        accepted = report.accepted,
        rejected = report.rejected,
        flagged = report.flagged,
        "Ingest complete"
    );
    for reason in &report.rejection_samples {
        warn!(%reason, "Row rejected");
    }
    if report.flagged > 0 {
        warn!(
            flagged = report.flagged,
            "Rows with coordinates outside the operational region (kept)"
        );
    }

    let filtered = filter::apply(&dataset, &filters.to_spec());
    if filtered.is_empty() && !dataset.is_empty() {
        warn!("active filters matched no records");
    }
    Ok(filtered)
}

/// Serializes a layer as pretty JSON to `output`, or stdout when absent.
fn write_layer<T: Serialize>(layer: &T, output: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(layer)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("cannot write layer to {path}"))?;
            info!(path, "Layer written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
