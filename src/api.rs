//! HTTP API handlers for groundwatch.
//!
//! A thin JSON façade over [`DataService`]. Handlers never see provider
//! errors: the service always answers with real, derived or synthetic data.
//! The only non-2xx responses are `404` for station-scoped derivations of an
//! unknown station and `400` for malformed parameters (rejected by axum's
//! extractors).
//!
//! # Endpoints
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/health` | `200` |
//! | GET | `/stations?force=` | `Station[]` |
//! | GET | `/stations/search?q=` | `Station[]` |
//! | GET | `/stations/filter?state=&district=&status=&minLevel=&maxLevel=` | `Station[]` |
//! | GET | `/stations/:id/water-levels?days=` | `TimeSeriesReading[]` |
//! | GET | `/stations/:id/water-quality` | `WaterQuality` + `classification` |
//! | GET | `/stations/:id/risk` | `RiskAssessment` |
//! | GET | `/stations/:id/insights` | `StationInsights` |
//! | GET | `/stations/:id/predictions?days=` | `Prediction[]` |
//! | GET | `/rainfall?state=&district=&year=` | `RainfallObservation[]` |
//! | GET | `/states/:state/stats` | `StateStats` |
//! | GET | `/drought` | `DroughtRecord[]` |
//! | GET | `/dashboard/stats` | `DashboardStats` |
//! | GET | `/data-source` | `DataSourceInfo` |
//! | POST | `/cache/clear` | `204` |
//! | PUT | `/data-mode` | `DataSourceInfo` |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::model::{
    DashboardStats, DataSourceInfo, DroughtRecord, Prediction, QualityClass, RainfallObservation,
    RainfallQuery, RiskAssessment, StateStats, Station, StationFilter, StationInsights,
    TimeSeriesReading, WaterQuality,
};
use crate::service::DataService;

const DEFAULT_WATER_LEVEL_DAYS: u32 = 30;
const DEFAULT_PREDICTION_DAYS: u32 = 7;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DataService>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stations", get(get_stations))
        .route("/stations/search", get(search_stations))
        .route("/stations/filter", get(filter_stations))
        .route("/stations/:id/water-levels", get(get_water_levels))
        .route("/stations/:id/water-quality", get(get_water_quality))
        .route("/stations/:id/risk", get(get_risk))
        .route("/stations/:id/insights", get(get_insights))
        .route("/stations/:id/predictions", get(get_predictions))
        .route("/rainfall", get(get_rainfall))
        .route("/states/:state/stats", get(get_state_stats))
        .route("/drought", get(get_drought))
        .route("/dashboard/stats", get(get_dashboard_stats))
        .route("/data-source", get(get_data_source))
        .route("/cache/clear", post(clear_cache))
        .route("/data-mode", put(set_data_mode))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Default, Deserialize)]
pub struct StationsQuery {
    #[serde(default)]
    pub force: bool,
}

/// GET /stations - The current station list.
///
/// `force=true` bypasses the cache.
#[instrument(skip(state))]
pub async fn get_stations(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Json<Vec<Station>> {
    let stations = state.service.get_stations(query.force).await;
    info!(count = stations.len(), "Stations queried");
    Json(stations.to_vec())
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /stations/search - Case-insensitive search over name, district and state.
#[instrument(skip(state))]
pub async fn search_stations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Station>> {
    let stations = state.service.search_stations(&query.q).await;
    info!(count = stations.len(), "Stations searched");
    Json(stations)
}

/// GET /stations/filter - Stations matching every supplied filter.
#[instrument(skip(state))]
pub async fn filter_stations(
    State(state): State<AppState>,
    Query(filter): Query<StationFilter>,
) -> Json<Vec<Station>> {
    Json(state.service.get_stations_by_filter(&filter).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

/// GET /stations/:id/water-levels - Water-level history, oldest first.
///
/// `days` defaults to 30.
#[instrument(skip(state))]
pub async fn get_water_levels(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Json<Vec<TimeSeriesReading>> {
    let days = query.days.unwrap_or(DEFAULT_WATER_LEVEL_DAYS);
    Json(state.service.get_water_level_data(&id, days).await)
}

/// Water-quality sample plus its drinking-water classification.
#[derive(Debug, Serialize)]
pub struct WaterQualityResponse {
    #[serde(flatten)]
    pub sample: WaterQuality,
    pub classification: QualityClass,
}

/// GET /stations/:id/water-quality - Latest water-quality sample.
#[instrument(skip(state))]
pub async fn get_water_quality(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<WaterQualityResponse> {
    let sample = state.service.get_water_quality(&id).await;
    let classification = sample.classification();
    Json(WaterQualityResponse {
        sample,
        classification,
    })
}

/// GET /stations/:id/risk - Depletion risk assessment.
#[instrument(skip(state))]
pub async fn get_risk(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RiskAssessment>, StatusCode> {
    state
        .service
        .get_risk_assessment(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /stations/:id/insights - Rule-based insights.
#[instrument(skip(state))]
pub async fn get_insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StationInsights>, StatusCode> {
    state
        .service
        .get_ai_insights(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /stations/:id/predictions - Forecast; `days` defaults to 7.
#[instrument(skip(state))]
pub async fn get_predictions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Json<Vec<Prediction>> {
    let days = query.days.unwrap_or(DEFAULT_PREDICTION_DAYS);
    Json(state.service.get_predictions(&id, days).await)
}

/// GET /rainfall - Daily rainfall for a state or district.
#[instrument(skip(state))]
pub async fn get_rainfall(
    State(state): State<AppState>,
    Query(query): Query<RainfallQuery>,
) -> Json<Vec<RainfallObservation>> {
    Json(
        state
            .service
            .get_rainfall_data(query.state, query.district, query.year)
            .await,
    )
}

/// GET /states/:state/stats - Per-state statistics.
#[instrument(skip(state))]
pub async fn get_state_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<StateStats> {
    Json(state.service.get_state_stats(&name).await)
}

/// GET /drought - District drought assessment.
#[instrument(skip(state))]
pub async fn get_drought(State(state): State<AppState>) -> Json<Vec<DroughtRecord>> {
    let records = state.service.get_drought_data().await;
    info!(count = records.len(), "Drought data queried");
    Json(records)
}

/// GET /dashboard/stats - Network-wide summary.
#[instrument(skip(state))]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.service.get_dashboard_stats().await)
}

/// GET /data-source - Cache and provider status.
#[instrument(skip(state))]
pub async fn get_data_source(State(state): State<AppState>) -> Json<DataSourceInfo> {
    Json(state.service.get_data_source_info())
}

/// POST /cache/clear - Drop the cached station list.
#[instrument(skip(state))]
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.service.clear_cache();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModeRequest {
    pub use_real_data: bool,
}

/// PUT /data-mode - Switch between real and synthetic data.
///
/// ```json
/// { "useRealData": true }
/// ```
#[instrument(skip(state))]
pub async fn set_data_mode(
    State(state): State<AppState>,
    Json(request): Json<DataModeRequest>,
) -> Json<DataSourceInfo> {
    state.service.set_use_real_data(request.use_real_data);
    Json(state.service.get_data_source_info())
}
