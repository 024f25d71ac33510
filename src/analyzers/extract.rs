//! Alias-driven field extraction from loosely-typed sheet rows.
//!
//! Every function here is total: a missing or unparsable field yields
//! `None` / an empty string, never an error.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::types::{FieldValue, RawRow};

/// Logical fields the pipeline reads from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    RegionName,
    CityName,
    DistrictName,
    SiteName,
    Status,
    FuelPct,
    GenLoadPct,
    GeneratorCapacity,
}

/// Known column labels per field, in priority order.
static ALIASES: &[(FieldKind, &[&str])] = &[
    (
        FieldKind::RegionName,
        &["Region", "region", "Region Name", "REGION", "region_name"],
    ),
    (
        FieldKind::CityName,
        &["City", "city", "City Name", "CITY", "city_name"],
    ),
    (
        FieldKind::DistrictName,
        &["District", "district", "District Name", "DISTRICT", "Area"],
    ),
    (
        FieldKind::SiteName,
        &["Site Name", "Site", "site", "Site ID", "COW ID", "COW Name"],
    ),
    (
        FieldKind::Status,
        &["Status", "status", "Site Status", "COW Status", "STATUS"],
    ),
    (
        FieldKind::FuelPct,
        &[
            "Fuel %",
            "Fuel Level %",
            "Fuel Percentage",
            "Fuel Level",
            "fuel_pct",
            "Fuel",
        ],
    ),
    (
        FieldKind::GenLoadPct,
        &[
            "Gen Load %",
            "Generator Load %",
            "Gen Load",
            "Generator Load",
            "Load %",
            "gen_load_pct",
        ],
    ),
    (
        FieldKind::GeneratorCapacity,
        &[
            "Generator Capacity",
            "Gen Capacity",
            "Capacity (kVA)",
            "DG Capacity",
            "Capacity",
            "generator_capacity",
        ],
    ),
];

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));

impl FieldKind {
    /// Column labels tried for this field, highest priority first.
    pub fn aliases(self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldKind::FuelPct | FieldKind::GenLoadPct | FieldKind::GeneratorCapacity
        )
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First non-blank cell among the field's aliases.
pub fn raw_value(row: &RawRow, kind: FieldKind) -> Option<&Value> {
    kind.aliases()
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find(|v| !is_blank(v))
}

/// Parses a percentage-like cell: `"1,234.5"`, `"45%"`, `45`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != ',' && *c != '%' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First decimal number anywhere in the cell, tolerating units like `"500 kVA"`.
pub fn parse_capacity(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => {
            let cleaned = s.replace(',', "");
            FIRST_NUMBER
                .find(&cleaned)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        }
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric field value, `None` when absent or unparsable.
pub fn extract_number(row: &RawRow, kind: FieldKind) -> Option<f64> {
    let value = raw_value(row, kind)?;
    if kind == FieldKind::GeneratorCapacity {
        parse_capacity(value)
    } else {
        parse_number(value)
    }
}

/// Trimmed text field value, empty when absent.
pub fn extract_text(row: &RawRow, kind: FieldKind) -> String {
    raw_value(row, kind).map(value_text).unwrap_or_default()
}

/// Generator capacity (kVA), `None` when absent or unparsable.
pub fn extract_capacity(row: &RawRow) -> Option<f64> {
    extract_number(row, FieldKind::GeneratorCapacity)
}

/// Generic accessor: numbers for numeric kinds, text otherwise.
pub fn extract_field(row: &RawRow, kind: FieldKind) -> FieldValue {
    if kind.is_numeric() {
        extract_number(row, kind).map_or(FieldValue::Null, FieldValue::Number)
    } else {
        FieldValue::Text(extract_text(row, kind))
    }
}

/// Whether a status cell means the site is on air.
///
/// Case, spaces, hyphens and underscores are ignored, so `"On-Air"`,
/// `"onair"`, `"ON AIR"` and `"In Progress"` all count.
pub fn is_active_status(status: &str) -> bool {
    let normalized: String = status
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    matches!(normalized.as_str(), "onair" | "inprogress")
}
