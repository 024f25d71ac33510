//! Month-by-month accumulative fuel, CO₂ and power series per city.

use chrono::{Datelike, Months, NaiveDate, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::analyzers::types::{AccumulativeSeriesPoint, CityAccumulation, RawRow};
use crate::analyzers::utility::round2;
use crate::synthetic::{seeded_jitter, seeded_random};

/// kg of CO₂ per litre of diesel.
pub const CO2_KG_PER_LITER: f64 = 2.68;
pub const KWH_PER_LITER: f64 = 0.9;
/// Jitter amplitude as a share of the city baseline.
pub const JITTER_SHARE: f64 = 0.05;

/// Longest window a caller may request, in months.
pub const MAX_WINDOW_MONTHS: usize = 120;

const BASELINE_MIN_LITERS: f64 = 20_000.0;
const BASELINE_SPAN_LITERS: f64 = 100_000.0;

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d").ok()
}

pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// January 2025, the first month of fleet reporting.
pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

/// Start used when the caller names only an end: [`default_start`], moved
/// forward if needed so the window stays within [`MAX_WINDOW_MONTHS`].
pub fn default_start_for(end: NaiveDate) -> NaiveDate {
    let span = Months::new(MAX_WINDOW_MONTHS as u32 - 1);
    let earliest = first_of_month(end).checked_sub_months(span).unwrap_or(end);
    default_start().max(earliest)
}

pub fn current_month() -> NaiveDate {
    first_of_month(Utc::now().date_naive())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Number of months from `start` through `end`, inclusive. Zero when inverted.
pub fn window_months(start: NaiveDate, end: NaiveDate) -> usize {
    let index = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    usize::try_from(index(end) - index(start) + 1).unwrap_or(0)
}

/// Trimmed, non-empty city names with duplicates removed, first-seen order.
pub fn unique_cities<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

/// Parses a comma-separated city list such as `Jeddah, Dammam`.
pub fn split_city_list(text: &str) -> Vec<String> {
    unique_cities(text.split(',').map(str::to_string))
}

/// Every first-of-month from `start` through `end`, inclusive.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let end = first_of_month(end);
    let mut month = first_of_month(start);
    let mut out = Vec::new();

    while month <= end {
        out.push(month);
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }

    out
}

/// Full-window fuel total for the city at `city_index`. Stable across calls.
pub fn city_baseline(city_index: usize) -> f64 {
    (BASELINE_MIN_LITERS + seeded_random(city_index as u64 + 1) * BASELINE_SPAN_LITERS).round()
}

/// Noise-free ramp value for month `month_index` of `total_months`.
pub fn base_term(baseline: f64, month_index: usize, total_months: usize) -> f64 {
    if total_months == 0 {
        return 0.0;
    }
    baseline * (month_index + 1) as f64 / total_months as f64
}

fn accumulation(fuel_liters: f64) -> CityAccumulation {
    CityAccumulation {
        fuel_liters,
        co2_tons: round2(fuel_liters * CO2_KG_PER_LITER / 1000.0),
        power_kwh: (fuel_liters * KWH_PER_LITER).round(),
    }
}

/// Builds the accumulative series. An inverted window yields an empty series.
pub fn build_accumulative(
    start: NaiveDate,
    end: NaiveDate,
    city_names: &[String],
) -> Vec<AccumulativeSeriesPoint> {
    let months = months_between(start, end);
    let total = months.len();

    months
        .iter()
        .enumerate()
        .map(|(month_index, month)| {
            let per_city: BTreeMap<String, CityAccumulation> = city_names
                .iter()
                .enumerate()
                .map(|(city_index, name)| {
                    let baseline = city_baseline(city_index);
                    let noise = seeded_jitter(city_index as u64, month_index as u64)
                        * baseline
                        * JITTER_SHARE;
                    let liters = (base_term(baseline, month_index, total) + noise)
                        .round()
                        .max(0.0);
                    (name.clone(), accumulation(liters))
                })
                .collect();

            AccumulativeSeriesPoint {
                month: format_month(*month),
                per_city,
            }
        })
        .collect()
}

/// Flattens the series into one row per (month, city) for CSV export.
pub fn to_rows(series: &[AccumulativeSeriesPoint]) -> Vec<RawRow> {
    series
        .iter()
        .flat_map(|point| {
            point.per_city.iter().map(|(city, acc)| {
                let mut row = RawRow::new();
                row.insert("month".into(), Value::from(point.month.clone()));
                row.insert("city".into(), Value::from(city.clone()));
                row.insert("fuelLiters".into(), Value::from(acc.fuel_liters));
                row.insert("co2Tons".into(), Value::from(acc.co2_tons));
                row.insert("powerKwh".into(), Value::from(acc.power_kwh));
                row
            })
        })
        .collect()
}
