//! Axum router configuration

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::limits::rate_limit_middleware;
use crate::state::AppState;

use super::handlers::{
    health_check, list_catalog, login, mint_stream_url, verify_session, version_check,
};
use super::middleware::stream_cors;
use super::streams::stream_object;

/// Request body cap for the JSON endpoints
const JSON_BODY_LIMIT: usize = 100 * 1024;

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // Login and minting carry their own, stricter budgets on top of the
    // shared API budget.
    let login_routes = Router::new()
        .route("/api/login", post(login))
        .route_layer(from_fn_with_state(
            state.login_limiter.clone(),
            rate_limit_middleware,
        ));

    let mint_routes = Router::new()
        .route("/api/stream-url/{id}", get(mint_stream_url))
        .route_layer(from_fn_with_state(
            state.mint_limiter.clone(),
            rate_limit_middleware,
        ));

    let rate_limited_api = Router::new()
        .route("/api/auth/verify", get(verify_session))
        .merge(login_routes)
        .merge(mint_routes)
        .layer(from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit_middleware,
        ));

    // The catalog shares the JSON CORS policy but carries no budget.
    let api = Router::new()
        .route("/songs", get(list_catalog))
        .merge(rate_limited_api)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(api_cors_layer(&state.config.allowed_origins));

    // The stream routes manage CORS themselves; see middleware::stream_cors.
    let streams = Router::new()
        .route("/stream/{id}", get(stream_object))
        .layer(from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), stream_cors));

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        .merge(api)
        .merge(streams)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}
