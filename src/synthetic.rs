//! Deterministic demo and fallback data.
//!
//! Nothing here reads the clock or an OS random source: the same inputs
//! always produce the same rows, on every platform.

use serde_json::Value;

use crate::analyzers::types::RawRow;
use crate::catalog::Catalog;

/// Maps an integer seed to a pseudo-random value in `[0, 1)` (splitmix64 finaliser).
pub fn seeded_random(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}

/// Combines two ordinals into one seed.
pub fn pair_seed(a: u64, b: u64) -> u64 {
    a.wrapping_mul(1_000_003).wrapping_add(b)
}

/// Symmetric jitter in `[-1, 1)` keyed by two ordinals.
pub fn seeded_jitter(a: u64, b: u64) -> f64 {
    seeded_random(pair_seed(a, b)) * 2.0 - 1.0
}

const CAPACITIES_KVA: [u32; 5] = [250, 350, 500, 750, 1000];

fn status_for(roll: f64) -> &'static str {
    if roll < 0.75 {
        "On Air"
    } else if roll < 0.9 {
        "In Progress"
    } else {
        "Off Air"
    }
}

/// One row per catalog site, labelled the way the live sheet labels its columns.
pub fn synthetic_rows(catalog: &Catalog) -> Vec<RawRow> {
    catalog
        .sites()
        .iter()
        .enumerate()
        .map(|(index, site)| {
            let i = index as u64;
            let city = catalog.city(&site.city_id);
            let region = city.and_then(|c| catalog.region(&c.region_id));

            let fuel = (10.0 + seeded_random(pair_seed(i, 1)) * 85.0).round();
            let load = (20.0 + seeded_random(pair_seed(i, 2)) * 70.0).round();
            let capacity_index =
                (seeded_random(pair_seed(i, 3)) * CAPACITIES_KVA.len() as f64) as usize;
            let capacity = CAPACITIES_KVA[capacity_index.min(CAPACITIES_KVA.len() - 1)];

            let mut row = RawRow::new();
            row.insert("Site Name".into(), Value::from(site.name.clone()));
            row.insert(
                "Region".into(),
                Value::from(region.map(|r| r.name.clone()).unwrap_or_default()),
            );
            row.insert(
                "City".into(),
                Value::from(city.map(|c| c.name.clone()).unwrap_or_default()),
            );
            row.insert(
                "District".into(),
                Value::from(site.district.clone().unwrap_or_default()),
            );
            row.insert(
                "Status".into(),
                Value::from(status_for(seeded_random(pair_seed(i, 4)))),
            );
            row.insert("Fuel %".into(), Value::from(format!("{fuel}%")));
            row.insert("Gen Load %".into(), Value::from(format!("{load}%")));
            row.insert(
                "Generator Capacity".into(),
                Value::from(format!("{capacity} kVA")),
            );
            row
        })
        .collect()
}
