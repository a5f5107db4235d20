//! Recognized CSV schema: canonical fields, the column alias table, and
//! the per-analysis required column sets.
//!
//! Upload headers are matched case-insensitively against the alias table
//! exactly once, at ingestion; nothing downstream inspects column names.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::SchemaError;

/// Canonical fields a delivery CSV can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Hub,
    Customer,
    Latitude,
    Longitude,
    HubLatitude,
    HubLongitude,
    Weight,
    DistanceKm,
    Timestamp,
    VehicleModel,
    Earning,
}

impl Field {
    /// Canonical name used in reports and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Hub => "hub",
            Field::Customer => "customer",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::HubLatitude => "hub_latitude",
            Field::HubLongitude => "hub_longitude",
            Field::Weight => "weight",
            Field::DistanceKm => "distance_km",
            Field::Timestamp => "timestamp",
            Field::VehicleModel => "vehicle_model",
            Field::Earning => "earning",
        }
    }
}

/// Synonyms seen across the upstream CSV exports, first match wins.
/// Matched case-insensitively against trimmed header names.
static ALIASES: &[(Field, &[&str])] = &[
    (Field::Id, &["id", "number", "trip_number", "order_id"]),
    (Field::Hub, &["hub", "hub_name", "microwarehouse"]),
    (Field::Customer, &["customer", "client", "destination"]),
    (Field::Latitude, &["latitude", "delivered_lat", "lat"]),
    (
        Field::Longitude,
        &["longitude", "delivered_long", "long", "lng", "lon"],
    ),
    (Field::HubLatitude, &["hub_latitude", "hub_lat"]),
    (Field::HubLongitude, &["hub_longitude", "hub_long"]),
    (Field::Weight, &["weight", "weight_kg"]),
    (Field::DistanceKm, &["distance_km", "kms", "distance"]),
    (
        Field::Timestamp,
        &["timestamp", "created_date", "actual_end_time", "date", "trip_date"],
    ),
    (Field::VehicleModel, &["vehicle_model", "model_name", "vehicle"]),
    (
        Field::Earning,
        &["earning", "per_trip_earning", "cost", "total_cost"],
    ),
];

/// Numeric field paired against distance in the correlation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    Weight,
    Earning,
}

impl TargetMetric {
    pub fn field(self) -> Field {
        match self {
            TargetMetric::Weight => Field::Weight,
            TargetMetric::Earning => Field::Earning,
        }
    }
}

impl Default for TargetMetric {
    fn default() -> Self {
        TargetMetric::Weight
    }
}

/// Which analysis the upload feeds; decides the minimal column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Flow,
    Density,
    WeightDistance(TargetMetric),
}

impl AnalysisKind {
    /// Columns that must be present in the header for this analysis.
    pub fn required_fields(self) -> Vec<Field> {
        let mut required = vec![Field::Id, Field::Hub, Field::Latitude, Field::Longitude];
        match self {
            AnalysisKind::Flow => {
                required.extend([Field::Customer, Field::HubLatitude, Field::HubLongitude]);
            }
            AnalysisKind::Density => {}
            AnalysisKind::WeightDistance(metric) => {
                required.extend([Field::DistanceKm, metric.field()]);
            }
        }
        required
    }
}

/// Header resolution result: canonical field to column index.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    indices: HashMap<Field, usize>,
}

impl ResolvedSchema {
    /// Matches a trimmed header against the alias table and verifies the
    /// columns `kind` requires are all present.
    pub fn resolve(header: &[String], kind: AnalysisKind) -> Result<Self, SchemaError> {
        if header.is_empty() || header.iter().all(|h| h.is_empty()) {
            return Err(SchemaError::NoHeader);
        }

        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            by_name.entry(name.to_lowercase()).or_insert(idx);
        }

        let mut indices = HashMap::new();
        for (field, aliases) in ALIASES {
            if let Some(idx) = aliases.iter().find_map(|a| by_name.get(*a)) {
                indices.insert(*field, *idx);
            }
        }

        let missing: Vec<String> = kind
            .required_fields()
            .into_iter()
            .filter(|f| !indices.contains_key(f))
            .map(|f| f.name().to_string())
            .collect();

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                missing,
                available: header.to_vec(),
            });
        }

        Ok(Self { indices })
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }
}
