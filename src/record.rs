//! Validated record and dataset types produced by ingestion.

use chrono::NaiveDateTime;
use serde::Serialize;

/// One validated delivery/trip row.
///
/// Every record that survives ingestion has a non-empty hub and
/// coordinates within hard WGS84 bounds. Optional fields are `None` when
/// the upload did not carry the column or the cell was empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub hub: String,
    pub customer: Option<String>,
    /// Delivered point, decimal degrees.
    pub latitude: f64,
    pub longitude: f64,
    /// Origin hub coordinates, when the upload carries them.
    pub hub_latitude: Option<f64>,
    pub hub_longitude: Option<f64>,
    pub weight: Option<f64>,
    pub distance_km: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
    pub vehicle_model: Option<String>,
    /// Per-trip earning or cost; negative values are cost adjustments.
    pub earning: Option<f64>,
    /// Coordinates fall outside the configured operational region.
    /// Flagged, never rejected.
    pub out_of_region: bool,
}

/// Ordered collection of validated records from a single upload.
///
/// A new upload replaces the dataset wholesale; nothing mutates it in
/// place after ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub records: Vec<DeliveryRecord>,
}

impl Dataset {
    pub fn new(records: Vec<DeliveryRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
