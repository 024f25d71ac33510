use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// Transport seam for sheet and hierarchy fetches.
///
/// Production code uses [`BasicClient`](super::BasicClient); tests swap in
/// canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
