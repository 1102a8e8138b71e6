// Axum API Server Module
//
// Purpose: HTTP surface over the geo lookup and the canal priority resolver
// Every request loads its own copy of the sources; only configuration is shared.

#[cfg(feature = "api")]
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};

#[cfg(feature = "api")]
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use crate::config::ServiceConfig;

#[cfg(feature = "api")]
use crate::error::{ErrorPayload, QueryError};

#[cfg(feature = "api")]
use crate::geospatial::{check_location, GeoSources, LocationResult};

#[cfg(feature = "api")]
use crate::resolver::{PriorityResolver, Resolution};

#[cfg(feature = "api")]
use crate::data::TableSources;

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PriorityResolver>,
    pub tables: Arc<TableSources>,
    pub geo: Arc<GeoSources>,
    pub nearest_k: usize,
}

#[cfg(feature = "api")]
impl AppState {
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        tracing::info!("Building priority resolver...");
        let resolver = Arc::new(config.build_resolver()?);

        Ok(Self {
            resolver,
            tables: Arc::new(config.table_sources()),
            geo: Arc::new(config.geo_sources()),
            nearest_k: config.nearest_k,
        })
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/check-location", get(check_location_handler))
        .route("/canal-priority", get(canal_priority_handler))
        // Middleware (applied in reverse order)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn home() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Canal lookup API is running!"
    }))
}

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
#[derive(Debug, serde::Deserialize)]
struct LocationQuery {
    lat: f64,
    lon: f64,
}

#[cfg(feature = "api")]
async fn check_location_handler(
    State(state): State<AppState>,
    params: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<LocationResult>, AppError> {
    let Query(params) = params?;
    tracing::debug!("Checking location lat={} lon={}", params.lat, params.lon);

    let geo = Arc::clone(&state.geo);
    let k = state.nearest_k;

    let result = tokio::task::spawn_blocking(move || check_location(&geo, params.lon, params.lat, k))
        .await
        .map_err(|e| QueryError::Internal(e.to_string()))??;

    Ok(Json(result))
}

#[cfg(feature = "api")]
#[derive(Debug, serde::Deserialize)]
struct CanalQuery {
    canal: String,
}

#[cfg(feature = "api")]
async fn canal_priority_handler(
    State(state): State<AppState>,
    params: Result<Query<CanalQuery>, QueryRejection>,
) -> Result<Json<Resolution>, AppError> {
    let Query(params) = params?;
    tracing::debug!("Resolving canal '{}'", params.canal.trim());

    let resolver = Arc::clone(&state.resolver);
    let tables = Arc::clone(&state.tables);

    let resolution = tokio::task::spawn_blocking(move || resolver.query(&params.canal, &tables))
        .await
        .map_err(|e| QueryError::Internal(e.to_string()))??;

    Ok(Json(resolution))
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
struct AppError(QueryError);

#[cfg(feature = "api")]
impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError(err)
    }
}

// Malformed or missing query parameters are bad input, answered with the same payload
#[cfg(feature = "api")]
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError(QueryError::InvalidInput(rejection.body_text()))
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let AppError(err) = self;
        let status = if err.is_source_failure() {
            tracing::error!("Query failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            tracing::debug!("Rejected request: {}", err);
            StatusCode::BAD_REQUEST
        };

        (status, Json(ErrorPayload::from(&err))).into_response()
    }
}
