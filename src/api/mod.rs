//! REST API module using Axum
//!
//! Serves the hierarchy, the sheet proxy, KPI snapshots, aggregates,
//! anomalies and accumulative trends to the dashboard front end.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::DashboardState;

use axum::Router;
use axum::http::{Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// `origins` is a comma-separated list of allowed origins, e.g.
/// `http://localhost:5173` for a local front-end dev server.
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        Some(origins) if !origins.trim().is_empty() => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        _ => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: DashboardState, cors_origins: Option<&str>) -> Router {
    routes::api_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
}
