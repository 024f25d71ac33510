//! Static region → city → site hierarchy of the COW fleet.
//!
//! A [`Catalog`] is built once per request (or per process) from a
//! [`Hierarchy`] and passed by reference into every pipeline function.
//! Districts are not nodes: they are free-text labels on sites.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::analyzers::extract::{FieldKind, extract_text};
use crate::analyzers::types::RawRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    pub region_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    pub city_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

/// Wire form of the hierarchy, as served by `GET /hierarchy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub regions: Vec<Region>,
    pub cities: Vec<City>,
    pub sites: Vec<Site>,
}

/// Validated, immutable hierarchy.
#[derive(Debug, Clone)]
pub struct Catalog {
    hierarchy: Hierarchy,
}

impl Catalog {
    /// Builds a catalog, checking that ids are unique and every reference resolves.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first dangling reference or duplicate id.
    pub fn new(hierarchy: Hierarchy) -> Result<Self> {
        let mut region_ids = HashSet::new();
        for region in &hierarchy.regions {
            ensure!(
                region_ids.insert(region.id.as_str()),
                "duplicate region id '{}'",
                region.id
            );
        }

        let mut city_ids = HashSet::new();
        for city in &hierarchy.cities {
            ensure!(
                city_ids.insert(city.id.as_str()),
                "duplicate city id '{}'",
                city.id
            );
            ensure!(
                region_ids.contains(city.region_id.as_str()),
                "city '{}' references unknown region '{}'",
                city.id,
                city.region_id
            );
        }

        let mut site_ids = HashSet::new();
        for site in &hierarchy.sites {
            ensure!(
                site_ids.insert(site.id.as_str()),
                "duplicate site id '{}'",
                site.id
            );
            ensure!(
                city_ids.contains(site.city_id.as_str()),
                "site '{}' references unknown city '{}'",
                site.id,
                site.city_id
            );
        }

        Ok(Self { hierarchy })
    }

    /// Parses and validates a `{regions, cities, sites}` JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let hierarchy: Hierarchy = serde_json::from_str(json)?;
        Self::new(hierarchy)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn regions(&self) -> &[Region] {
        &self.hierarchy.regions
    }

    pub fn cities(&self) -> &[City] {
        &self.hierarchy.cities
    }

    pub fn sites(&self) -> &[Site] {
        &self.hierarchy.sites
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.hierarchy.regions.iter().find(|r| r.id == id)
    }

    pub fn city(&self, id: &str) -> Option<&City> {
        self.hierarchy.cities.iter().find(|c| c.id == id)
    }

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.hierarchy.sites.iter().find(|s| s.id == id)
    }

    /// Exact, case-sensitive name match.
    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.hierarchy.regions.iter().find(|r| r.name == name)
    }

    /// Exact, case-sensitive name match.
    pub fn city_by_name(&self, name: &str) -> Option<&City> {
        self.hierarchy.cities.iter().find(|c| c.name == name)
    }

    pub fn site_by_name(&self, name: &str) -> Option<&Site> {
        self.hierarchy.sites.iter().find(|s| s.name == name)
    }

    pub fn cities_in<'a>(&'a self, region_id: &'a str) -> impl Iterator<Item = &'a City> + 'a {
        self.hierarchy
            .cities
            .iter()
            .filter(move |c| c.region_id == region_id)
    }

    /// City names in catalog order, optionally limited to one region.
    pub fn city_names(&self, region_id: Option<&str>) -> Vec<String> {
        match region_id {
            Some(region_id) => self.cities_in(region_id).map(|c| c.name.clone()).collect(),
            None => self.hierarchy.cities.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Distinct district labels found on sites, in first-seen order.
    ///
    /// With `region_id`, only sites whose city belongs to that region are scanned.
    pub fn districts(&self, region_id: Option<&str>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for site in &self.hierarchy.sites {
            if let Some(region_id) = region_id {
                let in_region = self
                    .city(&site.city_id)
                    .is_some_and(|c| c.region_id == region_id);
                if !in_region {
                    continue;
                }
            }

            if let Some(district) = site.district.as_deref().map(str::trim) {
                if !district.is_empty() && seen.insert(district.to_string()) {
                    out.push(district.to_string());
                }
            }
        }

        out
    }

    /// Maps a row's city text onto a catalog city. No fuzzy matching.
    pub fn resolve_city(&self, row: &RawRow) -> Option<&City> {
        let name = extract_text(row, FieldKind::CityName);
        if name.is_empty() {
            return None;
        }
        self.city_by_name(&name)
    }

    /// The row's region: through its resolved city, else by exact region name.
    pub fn resolve_region(&self, row: &RawRow) -> Option<&Region> {
        if let Some(city) = self.resolve_city(row) {
            return self.region(&city.region_id);
        }
        let name = extract_text(row, FieldKind::RegionName);
        if name.is_empty() {
            return None;
        }
        self.region_by_name(&name)
    }

    /// The row's site, by name first and then by id.
    pub fn resolve_site(&self, row: &RawRow) -> Option<&Site> {
        let text = extract_text(row, FieldKind::SiteName);
        if text.is_empty() {
            return None;
        }
        self.site_by_name(&text).or_else(|| self.site(&text))
    }

    /// The row's district text, else the district of its resolved site.
    /// Empty when neither is known.
    pub fn resolve_district(&self, row: &RawRow) -> String {
        let district = extract_text(row, FieldKind::DistrictName);
        if !district.is_empty() {
            return district;
        }
        self.resolve_site(row)
            .and_then(|site| site.district.as_deref())
            .map(|d| d.trim().to_string())
            .unwrap_or_default()
    }

    /// Built-in fleet used when no hierarchy source is configured.
    pub fn demo() -> Self {
        let regions = [
            ("riyadh", "Riyadh"),
            ("makkah", "Makkah"),
            ("eastern", "Eastern Province"),
            ("madinah", "Madinah"),
        ]
        .into_iter()
        .map(|(id, name)| Region {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

        let cities = [
            ("riyadh-city", "Riyadh", "riyadh"),
            ("al-kharj", "Al Kharj", "riyadh"),
            ("jeddah", "Jeddah", "makkah"),
            ("makkah-city", "Makkah", "makkah"),
            ("taif", "Taif", "makkah"),
            ("dammam", "Dammam", "eastern"),
            ("khobar", "Al Khobar", "eastern"),
            ("madinah-city", "Madinah", "madinah"),
        ]
        .into_iter()
        .map(|(id, name, region_id)| City {
            id: id.to_string(),
            name: name.to_string(),
            region_id: region_id.to_string(),
        })
        .collect();

        let sites = [
            ("COW-001", "riyadh-city", 24.6905, 46.6853, "Al Olaya"),
            ("COW-002", "riyadh-city", 24.8047, 46.6263, "Al Malqa"),
            ("COW-003", "riyadh-city", 24.7136, 46.6753, "Al Olaya"),
            ("COW-004", "al-kharj", 24.1556, 47.3120, "Al Kharj"),
            ("COW-005", "jeddah", 21.5587, 39.1548, "Al Rawdah"),
            ("COW-006", "jeddah", 21.5169, 39.1748, "Al Hamra"),
            ("COW-007", "jeddah", 21.6006, 39.1360, "Al Rawdah"),
            ("COW-008", "makkah-city", 21.4022, 39.8560, "Al Aziziyah"),
            ("COW-009", "taif", 21.2703, 40.4158, "Al Hada"),
            ("COW-010", "dammam", 26.4207, 50.0888, "Al Faisaliyah"),
            ("COW-011", "khobar", 26.2794, 50.2083, "Al Aqrabiyah"),
            ("COW-012", "madinah-city", 24.4397, 39.6172, "Quba"),
        ]
        .into_iter()
        .map(|(id, city_id, lat, lng, district)| Site {
            id: id.to_string(),
            name: format!("{id} {district}"),
            city_id: city_id.to_string(),
            lat,
            lng,
            district: Some(district.to_string()),
        })
        .collect();

        Self {
            hierarchy: Hierarchy {
                regions,
                cities,
                sites,
            },
        }
    }
}
