use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::fetch::{HttpClient, fetch_text};
use crate::services::CatalogApi;

/// Fetches the hierarchy from another dashboard instance's `GET /hierarchy`.
pub struct RemoteCatalog<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> RemoteCatalog<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/hierarchy") {
            base.to_string()
        } else {
            format!("{base}/hierarchy")
        }
    }
}

#[async_trait]
impl<C: HttpClient> CatalogApi for RemoteCatalog<C> {
    #[tracing::instrument(skip(self), fields(url = %self.url()))]
    async fn load_catalog(&self) -> Result<Catalog> {
        let body = fetch_text(&self.client, &self.url()).await?;
        Catalog::from_json(&body).context("remote hierarchy payload is invalid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::client::testing::StaticClient;

    const HIERARCHY: &str = r#"{"regions":[{"id":"r1","name":"Makkah"}],"cities":[{"id":"c1","name":"Jeddah","regionId":"r1"}],"sites":[]}"#;

    #[test]
    fn test_url_appends_hierarchy_once() {
        let remote = RemoteCatalog::new(StaticClient { status: 200, body: "" }, "http://hub:8080/");
        assert_eq!(remote.url(), "http://hub:8080/hierarchy");

        let remote = RemoteCatalog::new(StaticClient { status: 200, body: "" }, "http://hub/hierarchy");
        assert_eq!(remote.url(), "http://hub/hierarchy");
    }

    #[tokio::test]
    async fn test_load_remote_catalog() {
        let remote = RemoteCatalog::new(StaticClient { status: 200, body: HIERARCHY }, "http://hub");
        let catalog = remote.load_catalog().await.unwrap();
        assert_eq!(catalog.city("c1").unwrap().name, "Jeddah");
    }

    #[tokio::test]
    async fn test_remote_failure_is_error() {
        let remote = RemoteCatalog::new(StaticClient { status: 500, body: "boom" }, "http://hub");
        assert!(remote.load_catalog().await.is_err());
    }
}
