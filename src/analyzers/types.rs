//! Data types used by the aggregation pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One spreadsheet row: column label → scalar. Column order is preserved.
pub type RawRow = Map<String, Value>;

/// Hierarchy level a query is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    #[default]
    National,
    Region,
    City,
    Site,
}

/// User-selected hierarchy slice. Also decides the aggregation grouping key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default)]
    pub level: ScopeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl Scope {
    pub fn national() -> Self {
        Self::default()
    }

    pub fn region(region_id: &str) -> Self {
        Self {
            level: ScopeLevel::Region,
            region_id: Some(region_id.to_string()),
            ..Default::default()
        }
    }

    pub fn city(region_id: Option<&str>, city_id: &str) -> Self {
        Self {
            level: ScopeLevel::City,
            region_id: region_id.map(str::to_string),
            city_id: Some(city_id.to_string()),
            ..Default::default()
        }
    }

    pub fn site(site_id: &str) -> Self {
        Self {
            level: ScopeLevel::Site,
            site_id: Some(site_id.to_string()),
            ..Default::default()
        }
    }

    /// Restricts the scope to one district label.
    pub fn with_district(mut self, district: &str) -> Self {
        self.district = Some(district.to_string());
        self
    }
}

/// A value pulled out of a [`RawRow`] for one [`FieldKind`](super::extract::FieldKind).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

/// A metric reading paired with the generator's rated capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub value: f64,
    pub capacity: Option<f64>,
}

/// Which mean was chosen for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    Weighted,
    Simple,
}

/// Simple and capacity-weighted means of one metric within one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub simple: f64,
    pub weighted: f64,
    pub used: Weighting,
}

impl MetricSummary {
    /// The value charts display.
    pub fn display(&self) -> f64 {
        match self.used {
            Weighting::Weighted => self.weighted,
            Weighting::Simple => self.simple,
        }
    }
}

/// Per-group output of the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gen_load: Option<MetricSummary>,
}

/// Current ("Today") snapshot across all groups of a scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub label: String,
    pub groups: Vec<GroupAggregate>,
}

/// Month-to-date totals for one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAccumulation {
    pub fuel_liters: f64,
    pub co2_tons: f64,
    pub power_kwh: f64,
}

/// One month of the accumulative series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulativeSeriesPoint {
    pub month: String,
    pub per_city: BTreeMap<String, CityAccumulation>,
}

/// Current KPI snapshot for one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    pub scope: Scope,
    pub total_sites: usize,
    pub active_sites: usize,
    pub avg_fuel_pct: Option<f64>,
    pub avg_gen_load_pct: Option<f64>,
    pub fuel_weighting: Option<Weighting>,
    pub total_capacity_kva: f64,
    pub low_fuel_sites: usize,
    pub fuel_band: String,
}
