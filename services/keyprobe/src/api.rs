//! HTTP surface over the key registry
//!
//! - POST /data  scan a text blob in the background (204)
//! - GET  /  per-provider counts and classifications
//! - GET  /list/{provider}  live keys grouped by tier
//! - GET  /list/{provider}/{tier}  keys with exactly that tier
//! - GET  /{provider}[/{tier}]  one random live key
//! - GET  /health, /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use key_pool::Registry;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{Instrument, info, info_span};

use crate::error::ApiError;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, prometheus: PrometheusHandle) -> Self {
        Self {
            registry,
            prometheus,
            started_at: Instant::now(),
        }
    }
}

/// Build the router with every route, request metrics, and a concurrency cap.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/data", post(ingest))
        .route("/", get(summary))
        .route("/list/{provider}", get(list_tiers))
        .route("/list/{provider}/{tier}", get(list_tier))
        .route("/{provider}", get(pick_any))
        .route("/{provider}/{tier}", get(pick_tier))
        .layer(middleware::from_fn(track_requests))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();
    let response = next.run(request).await;
    crate::metrics::record_request(
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// POST /data: accept raw text and scan it off the request path.
async fn ingest(State(state): State<AppState>, body: String) -> StatusCode {
    let scan_id = format!("scan_{}", uuid::Uuid::new_v4().as_simple());
    let span = info_span!("scan", scan_id = %scan_id, bytes = body.len());
    let registry = state.registry.clone();
    tokio::spawn(
        async move {
            registry.scan(&body).await;
            info!("scan finished");
        }
        .instrument(span),
    );
    StatusCode::NO_CONTENT
}

async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.summary().await)
}

async fn list_tiers(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.registry.tiers(&provider).await?))
}

async fn list_tier(
    State(state): State<AppState>,
    Path((provider, tier)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.registry.list(&provider, Some(tier.as_str())).await?))
}

async fn pick_any(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<String, ApiError> {
    Ok(state.registry.pick(&provider, None).await?)
}

async fn pick_tier(
    State(state): State<AppState>,
    Path((provider, tier)): Path<(String, String)>,
) -> Result<String, ApiError> {
    Ok(state.registry.pick(&provider, Some(tier.as_str())).await?)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "providers": state.registry.providers().collect::<Vec<_>>(),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
