//! Row sources: spreadsheet exports and the synthetic fallback.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::analyzers::types::RawRow;
use crate::catalog::Catalog;
use crate::fetch::{HttpClient, fetch_text};
use crate::parser::{parse_sheet, sheet_export_url};
use crate::services::RowSource;
use crate::synthetic::synthetic_rows;

/// Rows from a spreadsheet export, either over HTTP or from a local file.
pub struct SheetSource<C> {
    client: C,
    location: String,
}

impl<C: HttpClient> SheetSource<C> {
    /// Google Sheets share links are rewritten to their gviz export.
    pub fn new(client: C, location: &str) -> Self {
        Self {
            client,
            location: sheet_export_url(location.trim()),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[async_trait]
impl<C: HttpClient> RowSource for SheetSource<C> {
    #[tracing::instrument(skip(self), fields(source = %self.location))]
    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        let body = if self.location.starts_with("http") {
            fetch_text(&self.client, &self.location).await?
        } else {
            tokio::fs::read_to_string(&self.location)
                .await
                .with_context(|| format!("failed to read sheet file '{}'", self.location))?
        };

        debug!(bytes = body.len(), "Sheet body received, parsing");
        parse_sheet(&body)
    }

    fn describe(&self) -> String {
        format!("sheet:{}", self.location)
    }
}

/// Deterministic rows, one per catalog site.
pub struct SyntheticSource {
    catalog: Arc<Catalog>,
}

impl SyntheticSource {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RowSource for SyntheticSource {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        Ok(synthetic_rows(&self.catalog))
    }

    fn describe(&self) -> String {
        "synthetic".to_string()
    }
}
