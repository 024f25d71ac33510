//! API route definitions
//!
//! - /health - liveness
//! - /hierarchy - region/city/site catalog
//! - /districts - district labels, optionally per region
//! - /sheet - spreadsheet proxy, normalised to a row array
//! - /kpis - current KPI snapshot for a scope
//! - /aggregate, /aggregate.csv - "Today" chart record for a scope
//! - /anomalies - z-score outliers among in-scope sites
//! - /trends/accumulative, /trends/accumulative.csv - monthly accumulation per city

use axum::{Router, routing::get};

use super::handlers::{self, DashboardState};

pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/hierarchy", get(handlers::get_hierarchy))
        .route("/districts", get(handlers::get_districts))
        .route("/sheet", get(handlers::get_sheet))
        .route("/kpis", get(handlers::get_kpis))
        .route("/aggregate", get(handlers::get_aggregate))
        .route("/aggregate.csv", get(handlers::get_aggregate_csv))
        .route("/anomalies", get(handlers::get_anomalies))
        .route("/trends/accumulative", get(handlers::get_accumulative))
        .route(
            "/trends/accumulative.csv",
            get(handlers::get_accumulative_csv),
        )
        .with_state(state)
}
