use crate::analyzers::extract::{FieldKind, extract_capacity, extract_number, extract_text};
use crate::analyzers::types::{
    AggregateRow, GroupAggregate, MetricSample, MetricSummary, RawRow, Scope, Weighting,
};
use crate::analyzers::utility::{mean, round1};
use crate::catalog::Catalog;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Label of the single "current values" row.
pub const TODAY_LABEL: &str = "Today";

/// Group label used when a row carries no usable grouping text.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Key prefix for generator-load columns in the chart record.
pub const GEN_LOAD_PREFIX: &str = "gen_";

/// Suffix added to a group key that would collide with a marker key.
pub const GROUP_KEY_SUFFIX: &str = " (group)";

const MARKER_KEYS: [&str; 2] = ["name", "date"];

/// Chart column for a group's fuel value. Never equal to `name` or `date`.
pub fn chart_key(group: &str) -> String {
    if MARKER_KEYS.contains(&group) {
        format!("{group}{GROUP_KEY_SUFFIX}")
    } else {
        group.to_string()
    }
}

/// Summarises one metric within one group.
///
/// `weighted` only considers samples with a positive capacity. The displayed
/// value is `weighted` when any such sample exists, `simple` otherwise.
/// Returns `None` when there are no samples.
pub fn summarize(samples: &[MetricSample]) -> Option<MetricSummary> {
    if samples.is_empty() {
        return None;
    }

    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let simple = round1(mean(&values));

    let mut weighted_total = 0.0;
    let mut weight_sum = 0.0;

    for sample in samples {
        if let Some(capacity) = sample.capacity.filter(|c| *c > 0.0) {
            weighted_total += sample.value * capacity;
            weight_sum += capacity;
        }
    }

    let (weighted, used) = if weight_sum == 0.0 {
        (simple, Weighting::Simple)
    } else {
        (round1(weighted_total / weight_sum), Weighting::Weighted)
    };

    Some(MetricSummary {
        simple,
        weighted,
        used,
    })
}

/// Grouping label for a row under the given scope.
///
/// District scope → the district itself; region scope → each row's
/// district; otherwise → each row's region.
pub fn group_key(row: &RawRow, scope: &Scope, catalog: &Catalog) -> String {
    if let Some(district) = scope.district.as_deref() {
        return district.to_string();
    }

    let label = if scope.region_id.is_some() {
        catalog.resolve_district(row)
    } else {
        match catalog.resolve_region(row) {
            Some(region) => region.name.clone(),
            None => extract_text(row, FieldKind::RegionName),
        }
    };

    if label.is_empty() {
        UNKNOWN_GROUP.to_string()
    } else {
        label
    }
}

#[derive(Default)]
struct GroupSamples {
    fuel: Vec<MetricSample>,
    gen_load: Vec<MetricSample>,
}

/// Groups already-filtered rows and summarises fuel and generator load per group.
///
/// Groups appear in first-seen order. A group with no samples for either
/// metric is dropped.
pub fn aggregate(rows: &[&RawRow], scope: &Scope, catalog: &Catalog) -> AggregateRow {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, GroupSamples> = HashMap::new();

    for row in rows {
        let key = group_key(row, scope, catalog);
        let capacity = extract_capacity(row);

        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            GroupSamples::default()
        });

        if let Some(value) = extract_number(row, FieldKind::FuelPct) {
            entry.fuel.push(MetricSample { value, capacity });
        }
        if let Some(value) = extract_number(row, FieldKind::GenLoadPct) {
            entry.gen_load.push(MetricSample { value, capacity });
        }
    }

    let groups = order
        .into_iter()
        .filter_map(|name| {
            let samples = groups.remove(&name)?;
            let fuel = summarize(&samples.fuel);
            let gen_load = summarize(&samples.gen_load);

            if fuel.is_none() && gen_load.is_none() {
                return None;
            }

            Some(GroupAggregate {
                name,
                fuel,
                gen_load,
            })
        })
        .collect();

    AggregateRow {
        label: TODAY_LABEL.to_string(),
        groups,
    }
}

impl AggregateRow {
    /// Flat record consumed by the charts: `name`/`date` markers, one key
    /// per group for fuel and one `gen_`-prefixed key per group for load.
    pub fn to_chart_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".to_string(), Value::from(self.label.clone()));
        record.insert("date".to_string(), Value::from(self.label.clone()));

        for group in &self.groups {
            if let Some(fuel) = &group.fuel {
                record.insert(chart_key(&group.name), Value::from(fuel.display()));
            }
            if let Some(gen_load) = &group.gen_load {
                record.insert(
                    format!("{GEN_LOAD_PREFIX}{}", group.name),
                    Value::from(gen_load.display()),
                );
            }
        }

        record
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    fn samples(pairs: &[(f64, Option<f64>)]) -> Vec<MetricSample> {
        pairs
            .iter()
            .map(|(value, capacity)| MetricSample {
                value: *value,
                capacity: *capacity,
            })
            .collect()
    }

    #[test]
    fn test_summarize_weighted() {
        let s = summarize(&samples(&[(40.0, Some(100.0)), (60.0, Some(300.0))])).unwrap();
        assert_eq!(s.simple, 50.0);
        assert_eq!(s.weighted, 55.0);
        assert_eq!(s.used, Weighting::Weighted);
        assert_eq!(s.display(), 55.0);
    }

    #[test]
    fn test_summarize_degrades_to_simple() {
        let s = summarize(&samples(&[(40.0, None), (60.0, None)])).unwrap();
        assert_eq!(s.weighted, 50.0);
        assert_eq!(s.used, Weighting::Simple);
        assert_eq!(s.display(), 50.0);

        let s = summarize(&samples(&[(40.0, Some(0.0)), (60.0, Some(0.0))])).unwrap();
        assert_eq!(s.display(), 50.0);
        assert_eq!(s.used, Weighting::Simple);
    }

    #[test]
    fn test_summarize_equal_capacities_match_simple() {
        let s = summarize(&samples(&[
            (12.3, Some(250.0)),
            (45.6, Some(250.0)),
            (78.9, Some(250.0)),
        ]))
        .unwrap();
        assert!((s.weighted - s.simple).abs() <= 0.1);
    }

    #[test]
    fn test_summarize_ignores_non_positive_capacity_in_weighting() {
        let s = summarize(&samples(&[(40.0, Some(100.0)), (60.0, None), (80.0, Some(-5.0))])).unwrap();
        assert_eq!(s.simple, 60.0);
        assert_eq!(s.weighted, 40.0);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_national_groups_by_region() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"City": "Jeddah", "Fuel %": "40%", "Generator Capacity": "100 kVA"})),
            row(json!({"City": "Taif", "Fuel %": "60%", "Generator Capacity": "300 kVA"})),
            row(json!({"City": "Dammam", "Fuel %": 70, "Gen Load %": 30})),
            row(json!({"Region": "Northern Borders", "Fuel %": 20})),
            row(json!({"Fuel %": 10})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let agg = aggregate(&refs, &Scope::national(), &catalog);
        let names: Vec<&str> = agg.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Makkah", "Eastern Province", "Northern Borders", "Unknown"]
        );
        assert_eq!(agg.groups[0].fuel.unwrap().display(), 55.0);
        assert!(agg.groups[0].gen_load.is_none());
        assert_eq!(agg.groups[1].gen_load.unwrap().display(), 30.0);
    }

    #[test]
    fn test_hyphenated_capacity_still_weights() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"City": "Jeddah", "Fuel %": 40, "Generator Capacity": "DG-500 kVA"})),
            row(json!({"City": "Jeddah", "Fuel %": 60, "Generator Capacity": "300 kVA"})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let agg = aggregate(&refs, &Scope::national(), &catalog);
        let fuel = agg.groups[0].fuel.unwrap();
        assert_eq!(fuel.used, Weighting::Weighted);
        assert_eq!(fuel.display(), 47.5);
    }

    #[test]
    fn test_region_scope_falls_back_to_site_district() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"Site": "COW-006 Al Hamra", "City": "Jeddah", "Fuel %": 50})),
            row(json!({"Site": "COW-007", "City": "Jeddah", "Fuel %": 30})),
            row(json!({"Site": "COW-005", "City": "Jeddah", "District": "Corniche", "Fuel %": 20})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let agg = aggregate(&refs, &Scope::region("makkah"), &catalog);
        let names: Vec<&str> = agg.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Al Hamra", "Al Rawdah", "Corniche"]);
    }

    #[test]
    fn test_region_scope_groups_by_district() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"City": "Jeddah", "District": "Al Hamra", "Fuel %": 50})),
            row(json!({"City": "Jeddah", "District": "Al Rawdah", "Fuel %": 30})),
            row(json!({"City": "Jeddah", "Fuel %": 10})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let agg = aggregate(&refs, &Scope::region("makkah"), &catalog);
        let names: Vec<&str> = agg.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Al Hamra", "Al Rawdah", "Unknown"]);
    }

    #[test]
    fn test_district_scope_is_single_group() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"District": "Jeddah", "Fuel %": 50})),
            row(json!({"District": "Jeddah", "Fuel %": 70})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let scope = Scope::region("makkah").with_district("Jeddah");
        let agg = aggregate(&refs, &scope, &catalog);
        assert_eq!(agg.groups.len(), 1);
        assert_eq!(agg.groups[0].name, "Jeddah");
        assert_eq!(agg.groups[0].fuel.unwrap().simple, 60.0);
    }

    #[test]
    fn test_groups_without_metrics_are_dropped() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"City": "Jeddah", "Fuel %": "n/a"})),
            row(json!({"City": "Dammam", "Fuel %": 42})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let agg = aggregate(&refs, &Scope::national(), &catalog);
        assert_eq!(agg.groups.len(), 1);
        assert_eq!(agg.groups[0].name, "Eastern Province");
    }

    #[test]
    fn test_chart_record_keeps_markers_on_collision() {
        let catalog = Catalog::demo();
        let rows = [
            row(json!({"City": "Jeddah", "District": "name", "Fuel %": 40, "Gen Load %": 10})),
            row(json!({"City": "Jeddah", "District": "date", "Fuel %": 60})),
        ];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let record = aggregate(&refs, &Scope::region("makkah"), &catalog).to_chart_record();
        assert_eq!(record["name"], TODAY_LABEL);
        assert_eq!(record["date"], TODAY_LABEL);
        assert_eq!(record["name (group)"], 40.0);
        assert_eq!(record["date (group)"], 60.0);
        assert_eq!(record["gen_name"], 10.0);
    }

    #[test]
    fn test_chart_record_keys() {
        let catalog = Catalog::demo();
        let rows = [row(json!({"City": "Jeddah", "Fuel %": 40, "Gen Load %": "65%"}))];
        let refs: Vec<&RawRow> = rows.iter().collect();

        let record = aggregate(&refs, &Scope::national(), &catalog).to_chart_record();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "date", "Makkah", "gen_Makkah"]);
        assert_eq!(record["name"], json!("Today"));
        assert_eq!(record["Makkah"], json!(40.0));
        assert_eq!(record["gen_Makkah"], json!(65.0));
    }

    #[test]
    fn test_empty_input_gives_empty_aggregate() {
        let agg = aggregate(&[], &Scope::national(), &Catalog::demo());
        assert!(agg.is_empty());
        assert_eq!(agg.to_chart_record().len(), 2);
    }
}
