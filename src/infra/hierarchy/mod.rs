//! Hierarchy catalog providers.
//!
//! [`FileCatalog`] reads a `{regions, cities, sites}` JSON document from disk.
//! [`RemoteCatalog`] fetches the same document from a `/hierarchy` endpoint.
//! [`resolve_catalog`] tries each provider in turn and falls back to
//! [`Catalog::demo`].

mod client;

pub use client::RemoteCatalog;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::services::CatalogApi;

/// Loads the catalog from a JSON file:
/// ```json
/// {
///   "regions": [{"id": "makkah", "name": "Makkah"}],
///   "cities": [{"id": "jeddah", "name": "Jeddah", "regionId": "makkah"}],
///   "sites": [{"id": "COW-005", "name": "COW-005", "cityId": "jeddah",
///              "lat": 21.55, "lng": 39.15, "district": "Al Rawdah"}]
/// }
/// ```
pub struct FileCatalog {
    path: String,
}

impl FileCatalog {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CatalogApi for FileCatalog {
    async fn load_catalog(&self) -> Result<Catalog> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read hierarchy file '{}'", self.path))?;
        Catalog::from_json(&content)
            .with_context(|| format!("invalid hierarchy file '{}'", self.path))
    }
}

/// First provider that loads successfully wins; otherwise the demo catalog.
pub async fn resolve_catalog(providers: &[Box<dyn CatalogApi>]) -> Catalog {
    for provider in providers {
        match provider.load_catalog().await {
            Ok(catalog) => {
                info!(
                    regions = catalog.regions().len(),
                    cities = catalog.cities().len(),
                    sites = catalog.sites().len(),
                    "Hierarchy catalog loaded"
                );
                return catalog;
            }
            Err(e) => warn!(error = %e, "Hierarchy provider failed, trying next"),
        }
    }

    info!("Using built-in demo hierarchy");
    Catalog::demo()
}
