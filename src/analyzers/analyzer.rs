use crate::analyzers::aggregate::{aggregate, summarize};
use crate::analyzers::extract::{FieldKind, extract_capacity, extract_number, extract_text};
use crate::analyzers::grade::{LOW_FUEL_PCT, fuel_band};
use crate::analyzers::scope::{filter_rows, in_scope, is_active};
use crate::analyzers::types::{AggregateRow, KpiSnapshot, MetricSample, RawRow, Scope};
use crate::catalog::Catalog;
use crate::stats::{AnomalyReport, detect_anomalies};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gauge metric selectable by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[default]
    Fuel,
    GenLoad,
}

impl Metric {
    pub fn field(self) -> FieldKind {
        match self {
            Metric::Fuel => FieldKind::FuelPct,
            Metric::GenLoad => FieldKind::GenLoadPct,
        }
    }
}

/// Filters to active in-scope rows and aggregates them.
pub fn aggregate_scope(rows: &[RawRow], scope: &Scope, catalog: &Catalog) -> AggregateRow {
    let included = filter_rows(rows, scope, catalog);

    debug!(
        total = rows.len(),
        included = included.len(),
        "Rows filtered for aggregation"
    );

    aggregate(&included, scope, catalog)
}

fn samples(rows: &[&RawRow], kind: FieldKind) -> Vec<MetricSample> {
    rows.iter()
        .filter_map(|row| {
            extract_number(row, kind).map(|value| MetricSample {
                value,
                capacity: extract_capacity(row),
            })
        })
        .collect()
}

/// Current KPIs for one scope.
///
/// Site counts use containment only; averages and fuel alerts use active sites.
pub fn kpi_snapshot(rows: &[RawRow], scope: &Scope, catalog: &Catalog) -> KpiSnapshot {
    let scoped: Vec<&RawRow> = rows
        .iter()
        .filter(|row| in_scope(row, scope, catalog))
        .collect();
    let active: Vec<&RawRow> = scoped.iter().copied().filter(|row| is_active(row)).collect();

    let fuel = summarize(&samples(&active, FieldKind::FuelPct));
    let gen_load = summarize(&samples(&active, FieldKind::GenLoadPct));

    let total_capacity_kva = active
        .iter()
        .filter_map(|row| extract_capacity(row))
        .filter(|c| *c > 0.0)
        .sum();

    let low_fuel_sites = active
        .iter()
        .filter_map(|row| extract_number(row, FieldKind::FuelPct))
        .filter(|pct| *pct < LOW_FUEL_PCT)
        .count();

    let avg_fuel_pct = fuel.map(|s| s.display());

    KpiSnapshot {
        scope: scope.clone(),
        total_sites: scoped.len(),
        active_sites: active.len(),
        avg_fuel_pct,
        avg_gen_load_pct: gen_load.map(|s| s.display()),
        fuel_weighting: fuel.map(|s| s.used),
        total_capacity_kva,
        low_fuel_sites,
        fuel_band: fuel_band(avg_fuel_pct),
    }
}

/// Anomaly report over the active in-scope sites of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeAnomalies {
    pub metric: Metric,
    pub threshold: f64,
    /// Site label per series index.
    pub sites: Vec<String>,
    #[serde(flatten)]
    pub report: AnomalyReport,
}

pub fn scope_anomalies(
    rows: &[RawRow],
    scope: &Scope,
    catalog: &Catalog,
    metric: Metric,
    threshold: f64,
) -> ScopeAnomalies {
    let (sites, series): (Vec<String>, Vec<f64>) = filter_rows(rows, scope, catalog)
        .into_iter()
        .filter_map(|row| {
            let value = extract_number(row, metric.field())?;
            let site = extract_text(row, FieldKind::SiteName);
            Some((site, value))
        })
        .unzip();

    ScopeAnomalies {
        metric,
        threshold,
        sites,
        report: detect_anomalies(&series, threshold),
    }
}
