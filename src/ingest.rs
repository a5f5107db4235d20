//! CSV ingestion: header resolution, per-row validation, and the ingest
//! report.
//!
//! Ingestion never mutates its input and never aborts on a bad row; rows
//! failing validation are dropped and counted, with a sample of reasons
//! kept for diagnostics. Only a missing required column (or an unreadable
//! file) is fatal.

use std::collections::HashSet;
use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;
use tracing::debug;

use crate::error::SchemaError;
use crate::record::{Dataset, DeliveryRecord};
use crate::schema::{AnalysisKind, Field, ResolvedSchema};

/// How many rejection reasons the report keeps verbatim.
const MAX_REJECTION_SAMPLES: usize = 10;

/// Datetime/date formats accepted for the timestamp column, tried in
/// order. A bare `YYYY-MM` resolves to the first of the month.
static TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Soft-validity bounds for the operational region.
///
/// Rows outside are flagged and counted, never rejected; hard WGS84
/// bounds still apply first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Region {
    /// Bengaluru metropolitan operating area.
    pub fn bengaluru() -> Self {
        Self {
            min_lat: 11.5,
            max_lat: 14.5,
            min_lon: 76.0,
            max_lon: 79.0,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::bengaluru()
    }
}

/// Outcome counters for one ingestion run.
///
/// Invariant: `accepted + rejected == total`. `flagged` counts accepted
/// rows whose coordinates fall outside the soft region bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub flagged: usize,
    pub rejection_samples: Vec<String>,
}

impl IngestReport {
    fn reject(&mut self, line: usize, reason: &str) {
        self.rejected += 1;
        if self.rejection_samples.len() < MAX_REJECTION_SAMPLES {
            self.rejection_samples.push(format!("row {line}: {reason}"));
        }
    }
}

/// Parses and validates a delivery CSV into a [`Dataset`].
///
/// Column names are matched case-insensitively against the alias table in
/// [`crate::schema`]; `kind` decides which columns must be present.
///
/// # Errors
///
/// Returns [`SchemaError`] when the file is structurally unreadable, has
/// no header, or lacks a required column.
pub fn ingest<R: Read>(
    reader: R,
    kind: AnalysisKind,
    region: Region,
) -> Result<(Dataset, IngestReport), SchemaError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let schema = ResolvedSchema::resolve(&header, kind)?;

    let mut report = IngestReport::default();
    let mut records = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (i, row) in rdr.records().enumerate() {
        let line = i + 2; // header occupies line 1
        report.total += 1;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.reject(line, &format!("unreadable row: {e}"));
                continue;
            }
        };

        match parse_row(&row, &schema, region, &mut seen_ids) {
            Ok(record) => {
                if record.out_of_region {
                    report.flagged += 1;
                }
                report.accepted += 1;
                records.push(record);
            }
            Err(reason) => report.reject(line, &reason),
        }
    }

    debug!(
        total = report.total,
        accepted = report.accepted,
        rejected = report.rejected,
        flagged = report.flagged,
        "Ingestion finished"
    );

    Ok((Dataset::new(records), report))
}

fn cell<'a>(row: &'a StringRecord, schema: &ResolvedSchema, field: Field) -> Option<&'a str> {
    let idx = schema.index_of(field)?;
    match row.get(idx) {
        Some(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

/// Parses a numeric cell, tolerating thousands separators ("1,234.5").
fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Month resolution: "2025-04"
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

fn parse_row(
    row: &StringRecord,
    schema: &ResolvedSchema,
    region: Region,
    seen_ids: &mut HashSet<String>,
) -> Result<DeliveryRecord, String> {
    let id = cell(row, schema, Field::Id)
        .ok_or("missing id")?
        .to_string();
    if !seen_ids.insert(id.clone()) {
        return Err(format!("duplicate id '{id}'"));
    }

    let hub = cell(row, schema, Field::Hub)
        .ok_or("missing hub")?
        .to_string();

    let latitude = required_number(row, schema, Field::Latitude)?;
    let longitude = required_number(row, schema, Field::Longitude)?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {latitude} out of range"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {longitude} out of range"));
    }

    let hub_latitude = optional_number(row, schema, Field::HubLatitude)?;
    let hub_longitude = optional_number(row, schema, Field::HubLongitude)?;

    let weight = non_negative(optional_number(row, schema, Field::Weight)?, Field::Weight)?;
    let distance_km = non_negative(
        optional_number(row, schema, Field::DistanceKm)?,
        Field::DistanceKm,
    )?;

    let timestamp = match cell(row, schema, Field::Timestamp) {
        Some(raw) => Some(
            parse_timestamp(raw).ok_or_else(|| format!("unparseable timestamp '{raw}'"))?,
        ),
        None => None,
    };

    let customer = cell(row, schema, Field::Customer).map(str::to_string);
    let vehicle_model = cell(row, schema, Field::VehicleModel).map(str::to_string);
    // Negative earnings are cost adjustments, accepted as-is.
    let earning = optional_number(row, schema, Field::Earning)?;

    Ok(DeliveryRecord {
        id,
        hub,
        customer,
        latitude,
        longitude,
        hub_latitude,
        hub_longitude,
        weight,
        distance_km,
        timestamp,
        vehicle_model,
        earning,
        out_of_region: !region.contains(latitude, longitude),
    })
}

fn required_number(
    row: &StringRecord,
    schema: &ResolvedSchema,
    field: Field,
) -> Result<f64, String> {
    let raw = cell(row, schema, field).ok_or_else(|| format!("missing {}", field.name()))?;
    parse_number(raw).ok_or_else(|| format!("unparseable {} '{raw}'", field.name()))
}

fn optional_number(
    row: &StringRecord,
    schema: &ResolvedSchema,
    field: Field,
) -> Result<Option<f64>, String> {
    match cell(row, schema, field) {
        Some(raw) => parse_number(raw)
            .map(Some)
            .ok_or_else(|| format!("unparseable {} '{raw}'", field.name())),
        None => Ok(None),
    }
}

fn non_negative(value: Option<f64>, field: Field) -> Result<Option<f64>, String> {
    match value {
        Some(v) if v < 0.0 => Err(format!("negative {} {v}", field.name())),
        other => Ok(other),
    }
}
