//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{clear_cache, health, live_try_on, ready, remove_background, try_on, upload};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let tryon_routes = Router::new()
        .route("/tryon", post(try_on))
        .route("/live-tryon", post(live_try_on))
        .route("/remove-bg", post(remove_background))
        .route("/upload", post(upload));

    let admin_routes = Router::new().route("/admin/clear-cache", post(clear_cache));

    let rate_limiter = Arc::new(
        RateLimiterCache::new(state.config.rate_limit_rps, state.config.rate_limit_burst)
            .with_trusted_proxies(&state.config.trusted_proxies),
    );

    let api_routes = Router::new()
        .merge(tryon_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    // Uploaded photos and generated results
    let upload_routes = Router::new().nest_service("/uploads", ServeDir::new(state.store.root()));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(upload_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Multipart has its own 2 MB default; the layer below is the only cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
