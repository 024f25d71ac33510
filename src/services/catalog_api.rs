//! Traits for the two upstream collaborators: the hierarchy catalog and
//! the row feed.

use anyhow::Result;

use crate::analyzers::types::RawRow;
use crate::catalog::Catalog;

/// Abstraction over a hierarchy provider (JSON file, remote `/hierarchy`).
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    /// Returns the validated region/city/site catalog.
    async fn load_catalog(&self) -> Result<Catalog>;
}

/// Abstraction over a raw-row provider (spreadsheet export, synthetic data).
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    /// Fetches the current snapshot of rows.
    async fn fetch_rows(&self) -> Result<Vec<RawRow>>;

    /// Short label for logs.
    fn describe(&self) -> String;
}
