//! Pure predicate filtering over a dataset.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{Dataset, DeliveryRecord};

/// User-selected predicates, combined with logical AND across dimensions
/// and logical OR within a set dimension.
///
/// An absent option places no restriction on that dimension; ranges are
/// inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSpec {
    pub hubs: Option<BTreeSet<String>>,
    pub customers: Option<BTreeSet<String>>,
    pub vehicle_models: Option<BTreeSet<String>>,
    pub weight_range: Option<(f64, f64)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.hubs.is_none()
            && self.customers.is_none()
            && self.vehicle_models.is_none()
            && self.weight_range.is_none()
            && self.date_range.is_none()
    }

    /// A record lacking a field targeted by an active predicate does not
    /// satisfy that predicate.
    fn matches(&self, record: &DeliveryRecord) -> bool {
        if let Some(hubs) = &self.hubs {
            if !hubs.contains(&record.hub) {
                return false;
            }
        }
        if let Some(customers) = &self.customers {
            match &record.customer {
                Some(c) if customers.contains(c) => {}
                _ => return false,
            }
        }
        if let Some(models) = &self.vehicle_models {
            match &record.vehicle_model {
                Some(m) if models.contains(m) => {}
                _ => return false,
            }
        }
        if let Some((min, max)) = self.weight_range {
            match record.weight {
                Some(w) if w >= min && w <= max => {}
                _ => return false,
            }
        }
        if let Some((start, end)) = self.date_range {
            match record.timestamp {
                Some(t) if t.date() >= start && t.date() <= end => {}
                _ => return false,
            }
        }
        true
    }
}

/// Retains every record satisfying all active predicates, preserving
/// input order. An empty spec returns the dataset unchanged; an empty
/// result is a valid dataset, not an error.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    if spec.is_empty() {
        return dataset.clone();
    }
    Dataset::new(
        dataset
            .records
            .iter()
            .filter(|r| spec.matches(r))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, hub: &str, customer: &str, weight: f64) -> DeliveryRecord {
        DeliveryRecord {
            id: id.to_string(),
            hub: hub.to_string(),
            customer: Some(customer.to_string()),
            latitude: 12.97,
            longitude: 77.59,
            hub_latitude: None,
            hub_longitude: None,
            weight: Some(weight),
            distance_km: None,
            timestamp: None,
            vehicle_model: None,
            earning: None,
            out_of_region: false,
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            record("T1", "A", "X", 10.0),
            record("T2", "A", "Y", 20.0),
            record("T3", "B", "Y", 5.0),
        ])
    }

    fn hubs(names: &[&str]) -> Option<BTreeSet<String>> {
        Some(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let dataset = sample();
        let filtered = apply(&dataset, &FilterSpec::default());
        assert_eq!(filtered, dataset);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let dataset = sample();
        let spec = FilterSpec {
            hubs: hubs(&["A"]),
            weight_range: Some((0.0, 15.0)),
            ..FilterSpec::default()
        };

        let once = apply(&dataset, &spec);
        let twice = apply(&once, &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_more_restrictive_filter_yields_fewer_rows() {
        let dataset = sample();
        let loose = FilterSpec {
            hubs: hubs(&["A", "B"]),
            ..FilterSpec::default()
        };
        let tight = FilterSpec {
            hubs: hubs(&["A"]),
            weight_range: Some((15.0, 25.0)),
            ..FilterSpec::default()
        };

        assert!(apply(&dataset, &tight).len() <= apply(&dataset, &loose).len());
    }

    #[test]
    fn test_or_within_dimension_and_across_dimensions() {
        let dataset = sample();
        let spec = FilterSpec {
            hubs: hubs(&["A", "B"]),
            customers: Some(["Y".to_string()].into()),
            ..FilterSpec::default()
        };

        let filtered = apply(&dataset, &spec);
        let ids: Vec<&str> = filtered.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["T2", "T3"]);
    }

    #[test]
    fn test_record_without_field_fails_active_predicate() {
        let mut dataset = sample();
        dataset.records[0].weight = None;
        let spec = FilterSpec {
            weight_range: Some((0.0, 100.0)),
            ..FilterSpec::default()
        };

        let filtered = apply(&dataset, &spec);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let dataset = sample();
        let spec = FilterSpec {
            hubs: hubs(&["Z"]),
            ..FilterSpec::default()
        };

        let filtered = apply(&dataset, &spec);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_date_range_inclusive() {
        let mut dataset = sample();
        for (i, day) in [10, 15, 20].iter().enumerate() {
            dataset.records[i].timestamp = chrono::NaiveDate::from_ymd_opt(2025, 4, *day)
                .unwrap()
                .and_hms_opt(9, 0, 0);
        }
        let spec = FilterSpec {
            date_range: Some((
                NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            )),
            ..FilterSpec::default()
        };

        let filtered = apply(&dataset, &spec);
        let ids: Vec<&str> = filtered.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
    }
}
