//! Scope containment and the on-air status gate.

use crate::catalog::Catalog;

use super::extract::{FieldKind, extract_text, is_active_status};
use super::types::{RawRow, Scope};

/// Hierarchical containment only; status is not considered.
///
/// Every check that the scope carries is applied, AND-combined.
pub fn in_scope(row: &RawRow, scope: &Scope, catalog: &Catalog) -> bool {
    if let Some(district) = scope.district.as_deref() {
        if catalog.resolve_district(row) != district {
            return false;
        }
    }

    if let Some(region_id) = scope.region_id.as_deref() {
        let region = catalog.resolve_region(row).map(|r| r.id.as_str());
        if region != Some(region_id) {
            return false;
        }
    }

    if let Some(city_id) = scope.city_id.as_deref() {
        let city = catalog.resolve_city(row).map(|c| c.id.as_str());
        if city != Some(city_id) {
            return false;
        }
    }

    if let Some(site_id) = scope.site_id.as_deref() {
        let matches = match catalog.resolve_site(row) {
            Some(site) => site.id == site_id,
            None => extract_text(row, FieldKind::SiteName) == site_id,
        };
        if !matches {
            return false;
        }
    }

    true
}

/// Whether the row's status cell is an on-air alias.
pub fn is_active(row: &RawRow) -> bool {
    is_active_status(&extract_text(row, FieldKind::Status))
}

/// Rows that are both inside the scope and on air.
pub fn include_row(row: &RawRow, scope: &Scope, catalog: &Catalog) -> bool {
    in_scope(row, scope, catalog) && is_active(row)
}

/// Convenience filter over a batch.
pub fn filter_rows<'a>(rows: &'a [RawRow], scope: &Scope, catalog: &Catalog) -> Vec<&'a RawRow> {
    rows.iter()
        .filter(|row| include_row(row, scope, catalog))
        .collect()
}
