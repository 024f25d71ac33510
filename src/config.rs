//! Runtime settings and wiring of sources, catalog and cache.
//!
//! Every setting is a CLI flag backed by an environment variable, so a
//! `.env` file (loaded with `dotenvy`) is enough to configure a deployment.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::DashboardState;
use crate::cache::RowCache;
use crate::catalog::Catalog;
use crate::fetch::{BasicClient, HttpClient};
use crate::infra::hierarchy::{FileCatalog, RemoteCatalog, resolve_catalog};
use crate::infra::sheets::{SheetSource, SyntheticSource};
use crate::services::{CatalogApi, RowSource};

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Spreadsheet export URL or local file (gviz, CSV or JSON rows)
    #[arg(long, env = "COW_SHEET_URL")]
    pub sheet_url: Option<String>,

    /// JSON file holding {regions, cities, sites}
    #[arg(long, env = "COW_HIERARCHY_FILE")]
    pub hierarchy_file: Option<String>,

    /// Base URL of a service exposing GET /hierarchy
    #[arg(long, env = "COW_HIERARCHY_URL")]
    pub hierarchy_url: Option<String>,

    /// Upstream fetch timeout in seconds
    #[arg(long, env = "COW_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// How long fetched rows are served before refreshing, in seconds
    #[arg(long, env = "COW_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_url: None,
            hierarchy_file: None,
            hierarchy_url: None,
            fetch_timeout_secs: 10,
            cache_ttl_secs: 300,
        }
    }
}

impl Settings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    fn http_client(&self) -> Arc<dyn HttpClient> {
        Arc::new(BasicClient::new(self.fetch_timeout()))
    }

    /// Catalog from file, then remote, then the built-in demo fleet.
    pub async fn load_catalog(&self) -> Catalog {
        let mut providers: Vec<Box<dyn CatalogApi>> = Vec::new();

        if let Some(path) = self.hierarchy_file.as_deref() {
            providers.push(Box::new(FileCatalog::new(path)));
        }
        if let Some(url) = self.hierarchy_url.as_deref() {
            providers.push(Box::new(RemoteCatalog::new(self.http_client(), url)));
        }

        resolve_catalog(&providers).await
    }

    /// Builds the shared state used by both the CLI and the HTTP server.
    pub async fn build_state(&self) -> DashboardState {
        let catalog = Arc::new(self.load_catalog().await);
        let http = self.http_client();

        let source: Option<Arc<dyn RowSource>> = self
            .sheet_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| Arc::new(SheetSource::new(http.clone(), url)) as Arc<dyn RowSource>);

        match &source {
            Some(source) => info!(source = %source.describe(), "Row source configured"),
            None => info!("No sheet configured, serving synthetic rows"),
        }

        let rows = RowCache::new(
            source,
            Arc::new(SyntheticSource::new(catalog.clone())),
            self.cache_ttl(),
            self.fetch_timeout(),
        );

        DashboardState {
            catalog,
            rows: Arc::new(rows),
            http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Provenance;

    #[tokio::test]
    async fn test_default_settings_serve_demo_data() {
        let state = Settings::default().build_state().await;
        assert_eq!(state.catalog.sites().len(), Catalog::demo().sites().len());

        let snapshot = state.rows.get().await;
        assert_eq!(snapshot.provenance, Provenance::Synthetic);
        assert_eq!(snapshot.rows.len(), state.catalog.sites().len());
    }

    #[test]
    fn test_timeout_floor() {
        let settings = Settings {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(1));
    }
}
