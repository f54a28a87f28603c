//! Route handlers and router assembly (spec §6, SPEC_FULL §4.K).

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::api::dto::UploadBody;
use crate::error::AppError;
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitLayer};
use crate::middleware::request_logging_simple;
use crate::state::AppState;
use crate::upload::UploadOutcome;

/// Upload bodies are bounded by how long we're willing to hold a connection
/// open for a slow/stalled client; past this we treat the request as
/// cancelled rather than let it hang indefinitely (spec §7 `Cancelled`).
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    limit: Option<i64>,
}

const DEFAULT_HISTORY_LIMIT: i64 = 1000;

async fn get_listings(
    State(state): State<AppState>,
    Path((item_id, world_or_dc)): Path<(i32, String)>,
) -> Result<impl IntoResponse, AppError> {
    if world_or_dc.trim().is_empty() || !state.resolver.is_marketable(item_id) {
        return Err(AppError::NotFound);
    }

    let view = state.aggregator.resolve_and_fetch_listings(item_id, &world_or_dc).await?;
    Ok(Json(view))
}

async fn get_history(
    State(state): State<AppState>,
    Path((item_id, world_or_dc)): Path<(i32, String)>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    if world_or_dc.trim().is_empty() || !state.resolver.is_marketable(item_id) {
        return Err(AppError::NotFound);
    }

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 10_000);
    let view = state
        .aggregator
        .resolve_and_fetch_sales(item_id, &world_or_dc, limit)
        .await?;
    Ok(Json(view))
}

async fn post_upload(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
    Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = tokio::time::timeout(UPLOAD_TIMEOUT, state.upload_pipeline.handle(&api_key, body))
        .await
        .map_err(|_| AppError::Cancelled)??;

    match outcome {
        UploadOutcome::Accepted | UploadOutcome::Blacklisted => Ok(StatusCode::OK),
    }
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn metrics_endpoint(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

/// Assembles the full router: `/api/v2/*` query surface, `/upload/*`
/// ingestion, `/health`, and `/metrics`, layered with permissive CORS and
/// request logging.
///
/// Rate limiting is applied to the upload route only, ahead of the
/// blacklist — a coarse per-IP floodgate, not a fairness mechanism
/// (SPEC_FULL §4.K).
pub fn router(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let upload_limiter = RateLimitLayer::new(RateLimitConfig::default());

    let upload_routes = Router::new()
        .route("/upload/:api_key", post(post_upload))
        .route_layer(axum::middleware::from_fn_with_state(upload_limiter, rate_limit_middleware))
        .with_state(state.clone());

    let query_routes = Router::new()
        .route("/api/v2/:item_id/:world_or_dc", get(get_listings))
        .route("/api/v2/history/:item_id/:world_or_dc", get(get_history))
        .route("/health", get(health))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_endpoint))
        .with_state(metrics_handle);

    Router::new()
        .merge(query_routes)
        .merge(upload_routes)
        .merge(metrics_routes)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(request_logging_simple))
}
