//! API route handlers
//!
//! Handlers never surface upstream failures: rows come from the
//! pull-through cache (with synthetic fallback) and the sheet proxy
//! answers an empty array when the source cannot be read. Only
//! malformed query parameters produce a 400.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::envelope::ApiErrorResponse;
use crate::analyzers::accumulate::{
    MAX_WINDOW_MONTHS, build_accumulative, current_month, default_start_for, parse_month,
    split_city_list, to_rows, unique_cities, window_months,
};
use crate::analyzers::analyzer::{Metric, aggregate_scope, kpi_snapshot, scope_anomalies};
use crate::analyzers::types::{KpiSnapshot, RawRow, Scope, ScopeLevel};
use crate::cache::{Provenance, RowCache};
use crate::catalog::Catalog;
use crate::fetch::HttpClient;
use crate::infra::sheets::SheetSource;
use crate::output::to_csv;
use crate::services::RowSource;
use crate::stats::DEFAULT_THRESHOLD;

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    pub catalog: Arc<Catalog>,
    pub rows: Arc<RowCache>,
    /// Transport used by the `/sheet` proxy.
    pub http: Arc<dyn HttpClient>,
}

/// Scope selection as query parameters.
///
/// Blank values are ignored. Without an explicit `level` the most
/// specific id present decides it; an explicit level whose id is missing
/// is treated the same way.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    pub level: Option<String>,
    pub region_id: Option<String>,
    pub city_id: Option<String>,
    pub site_id: Option<String>,
    pub district: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<ScopeQuery> for Scope {
    fn from(query: ScopeQuery) -> Self {
        let region_id = non_blank(query.region_id);
        let city_id = non_blank(query.city_id);
        let site_id = non_blank(query.site_id);
        let district = non_blank(query.district);

        let explicit = query
            .level
            .as_deref()
            .map(|l| l.trim().to_ascii_lowercase());
        let level = match explicit.as_deref() {
            Some("national") => ScopeLevel::National,
            Some("region") if region_id.is_some() => ScopeLevel::Region,
            Some("city") if city_id.is_some() => ScopeLevel::City,
            Some("site") if site_id.is_some() => ScopeLevel::Site,
            _ if site_id.is_some() => ScopeLevel::Site,
            _ if city_id.is_some() => ScopeLevel::City,
            _ if region_id.is_some() => ScopeLevel::Region,
            _ => ScopeLevel::National,
        };

        Scope {
            level,
            region_id,
            city_id,
            site_id,
            district,
        }
    }
}

fn csv_response(result: anyhow::Result<String>, filename: &str) -> Response {
    match result {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => ApiErrorResponse::internal(format!("CSV export failed: {e}")),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub regions: usize,
    pub sites: usize,
}

/// GET /health
pub async fn get_health(State(state): State<DashboardState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        regions: state.catalog.regions().len(),
        sites: state.catalog.sites().len(),
    })
}

/// GET /hierarchy
pub async fn get_hierarchy(State(state): State<DashboardState>) -> Response {
    Json(state.catalog.hierarchy()).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictQuery {
    pub region_id: Option<String>,
}

/// GET /districts?regionId=
///
/// Distinct district labels of the catalog's sites, for scope pickers.
pub async fn get_districts(
    State(state): State<DashboardState>,
    Query(query): Query<DistrictQuery>,
) -> Json<Vec<String>> {
    Json(state.catalog.districts(non_blank(query.region_id).as_deref()))
}

#[derive(Debug, Deserialize)]
pub struct SheetQuery {
    pub sheet: Option<String>,
}

/// GET /sheet?sheet=<url>
///
/// Without `sheet`, serves the configured source's current rows.
pub async fn get_sheet(
    State(state): State<DashboardState>,
    Query(query): Query<SheetQuery>,
) -> Json<Vec<RawRow>> {
    let Some(url) = non_blank(query.sheet) else {
        let snapshot = state.rows.get().await;
        return Json(snapshot.rows.as_ref().clone());
    };

    if !url.starts_with("http") {
        warn!(url = %url, "Sheet proxy refused non-HTTP source");
        return Json(Vec::new());
    }

    let source = SheetSource::new(state.http.clone(), &url);
    match source.fetch_rows().await {
        Ok(rows) => {
            debug!(rows = rows.len(), "Sheet proxied");
            Json(rows)
        }
        Err(e) => {
            warn!(url = %source.location(), error = %e, "Sheet proxy fetch failed");
            Json(Vec::new())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResponse {
    #[serde(flatten)]
    pub kpis: KpiSnapshot,
    pub source: Provenance,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// GET /kpis?level=&regionId=&cityId=&siteId=&district=
pub async fn get_kpis(
    State(state): State<DashboardState>,
    Query(query): Query<ScopeQuery>,
) -> Json<KpiResponse> {
    let scope = Scope::from(query);
    let snapshot = state.rows.get().await;

    Json(KpiResponse {
        kpis: kpi_snapshot(&snapshot.rows, &scope, &state.catalog),
        source: snapshot.provenance,
        fetched_at: snapshot.fetched_at,
    })
}

/// GET /aggregate?…scope…
pub async fn get_aggregate(
    State(state): State<DashboardState>,
    Query(query): Query<ScopeQuery>,
) -> Json<RawRow> {
    let scope = Scope::from(query);
    let snapshot = state.rows.get().await;
    Json(aggregate_scope(&snapshot.rows, &scope, &state.catalog).to_chart_record())
}

/// GET /aggregate.csv?…scope…
pub async fn get_aggregate_csv(
    State(state): State<DashboardState>,
    Query(query): Query<ScopeQuery>,
) -> Response {
    let scope = Scope::from(query);
    let snapshot = state.rows.get().await;
    let record = aggregate_scope(&snapshot.rows, &scope, &state.catalog).to_chart_record();
    csv_response(to_csv(&[record]), "aggregate.csv")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyQuery {
    #[serde(flatten)]
    pub scope: ScopeQuery,
    pub metric: Option<String>,
    pub threshold: Option<String>,
}

/// GET /anomalies?…scope…&metric=fuel|genLoad&threshold=3
pub async fn get_anomalies(
    State(state): State<DashboardState>,
    Query(query): Query<AnomalyQuery>,
) -> Response {
    let metric = match query.metric.as_deref().map(str::trim) {
        None | Some("") | Some("fuel") => Metric::Fuel,
        Some("genLoad") | Some("gen_load") => Metric::GenLoad,
        Some(other) => return ApiErrorResponse::bad_request(format!("unknown metric '{other}'")),
    };

    let threshold = match query.threshold.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_THRESHOLD,
        Some(text) => match text.parse::<f64>() {
            Ok(t) if t >= 0.0 => t,
            _ => return ApiErrorResponse::bad_request(format!("invalid threshold '{text}'")),
        },
    };

    let scope = Scope::from(query.scope);
    let snapshot = state.rows.get().await;
    Json(scope_anomalies(
        &snapshot.rows,
        &scope,
        &state.catalog,
        metric,
        threshold,
    ))
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulativeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub cities: Option<String>,
    /// Limits the default city list to one region.
    pub region_id: Option<String>,
}

struct AccumulativeRequest {
    start: NaiveDate,
    end: NaiveDate,
    cities: Vec<String>,
}

fn parse_accumulative(
    query: AccumulativeQuery,
    catalog: &Catalog,
) -> Result<AccumulativeRequest, Response> {
    let month = |value: Option<String>, default: NaiveDate| match non_blank(value) {
        None => Ok(default),
        Some(text) => parse_month(&text).ok_or_else(|| {
            ApiErrorResponse::bad_request(format!("invalid month '{text}', expected YYYY-MM"))
        }),
    };

    let end = month(query.end, current_month())?;
    let start = month(query.start, default_start_for(end))?;

    let months = window_months(start, end);
    if months > MAX_WINDOW_MONTHS {
        return Err(ApiErrorResponse::bad_request(format!(
            "window of {months} months exceeds the {MAX_WINDOW_MONTHS}-month limit"
        )));
    }

    let region_id = non_blank(query.region_id);
    if let Some(id) = region_id.as_deref() {
        if catalog.region(id).is_none() {
            return Err(ApiErrorResponse::bad_request(format!("unknown region '{id}'")));
        }
    }

    let cities = match non_blank(query.cities) {
        Some(list) => split_city_list(&list),
        None => unique_cities(catalog.city_names(region_id.as_deref())),
    };

    Ok(AccumulativeRequest { start, end, cities })
}

/// GET /trends/accumulative?start=YYYY-MM&end=YYYY-MM&cities=a,b,c
pub async fn get_accumulative(
    State(state): State<DashboardState>,
    Query(query): Query<AccumulativeQuery>,
) -> Response {
    match parse_accumulative(query, &state.catalog) {
        Ok(req) => Json(build_accumulative(req.start, req.end, &req.cities)).into_response(),
        Err(resp) => resp,
    }
}

/// GET /trends/accumulative.csv?…
pub async fn get_accumulative_csv(
    State(state): State<DashboardState>,
    Query(query): Query<AccumulativeQuery>,
) -> Response {
    match parse_accumulative(query, &state.catalog) {
        Ok(req) => {
            let series = build_accumulative(req.start, req.end, &req.cities);
            csv_response(to_csv(&to_rows(&series)), "accumulative.csv")
        }
        Err(resp) => resp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::accumulate::default_start;

    #[test]
    fn test_scope_query_infers_level() {
        let scope = Scope::from(ScopeQuery {
            region_id: Some("makkah".into()),
            city_id: Some("jeddah".into()),
            ..Default::default()
        });
        assert_eq!(scope.level, ScopeLevel::City);

        let scope = Scope::from(ScopeQuery {
            region_id: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(scope, Scope::national());
    }

    #[test]
    fn test_scope_query_explicit_level_wins() {
        let scope = Scope::from(ScopeQuery {
            level: Some("Region".into()),
            region_id: Some("makkah".into()),
            district: Some("Al Hamra".into()),
            ..Default::default()
        });
        assert_eq!(scope.level, ScopeLevel::Region);
        assert_eq!(scope.district.as_deref(), Some("Al Hamra"));
    }

    #[test]
    fn test_parse_accumulative_defaults_to_catalog_cities() {
        let catalog = Catalog::demo();
        let req = parse_accumulative(AccumulativeQuery::default(), &catalog)
            .ok()
            .unwrap();
        assert_eq!(req.start, default_start());
        assert_eq!(req.cities.len(), catalog.cities().len());
    }

    #[test]
    fn test_parse_accumulative_rejects_bad_month() {
        let query = AccumulativeQuery {
            start: Some("2025/01".into()),
            ..Default::default()
        };
        assert!(parse_accumulative(query, &Catalog::demo()).is_err());
    }

    #[test]
    fn test_scope_query_level_without_id_is_inferred() {
        let scope = Scope::from(ScopeQuery {
            level: Some("region".into()),
            ..Default::default()
        });
        assert_eq!(scope, Scope::national());

        let scope = Scope::from(ScopeQuery {
            level: Some("site".into()),
            city_id: Some("jeddah".into()),
            ..Default::default()
        });
        assert_eq!(scope.level, ScopeLevel::City);
    }

    #[test]
    fn test_parse_accumulative_region_cities() {
        let catalog = Catalog::demo();
        let query = AccumulativeQuery {
            region_id: Some("eastern".into()),
            ..Default::default()
        };
        let req = parse_accumulative(query, &catalog).ok().unwrap();
        assert_eq!(req.cities, vec!["Dammam", "Al Khobar"]);

        let query = AccumulativeQuery {
            region_id: Some("tabuk".into()),
            ..Default::default()
        };
        assert!(parse_accumulative(query, &catalog).is_err());
    }

    #[test]
    fn test_parse_accumulative_deduplicates_cities() {
        let query = AccumulativeQuery {
            cities: Some("Jeddah,Jeddah, Dammam".into()),
            ..Default::default()
        };
        let req = parse_accumulative(query, &Catalog::demo()).ok().unwrap();
        assert_eq!(req.cities, vec!["Jeddah", "Dammam"]);
    }

    #[test]
    fn test_parse_accumulative_caps_window() {
        let catalog = Catalog::demo();
        let query = AccumulativeQuery {
            start: Some("2020-01".into()),
            end: Some("2029-12".into()),
            ..Default::default()
        };
        assert!(parse_accumulative(query, &catalog).is_ok());

        let query = AccumulativeQuery {
            start: Some("0001-01".into()),
            end: Some("9999-12".into()),
            ..Default::default()
        };
        assert!(parse_accumulative(query, &catalog).is_err());
    }
}
