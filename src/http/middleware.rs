//! Request extractors and stream-route middleware

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated subject, extracted from a session token
///
/// Accepts `Authorization: Bearer <token>` or, for media elements that
/// cannot set headers, a `t` query parameter.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).or_else(|| query_token(parts));
        let claims = token
            .and_then(|token| state.tokens.verify(&token))
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;
        Ok(AuthUser(claims.u))
    }
}

/// Token from the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn query_token(parts: &Parts) -> Option<String> {
    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .ok()?
        .0
        .remove("t")
}

/// CORS and cache headers for the stream routes
///
/// The stream endpoint manages its own CORS: audio elements send Range
/// requests, and players need the range response headers exposed.
/// Preflights are answered directly with 204.
pub async fn stream_cors(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let request_origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let allow_origin = allowed_origin(&state.config.allowed_origins, request_origin.as_deref());

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_stream_cors(response.headers_mut(), allow_origin.as_deref());
        return response;
    }

    let mut response = next.run(request).await;
    apply_stream_cors(response.headers_mut(), allow_origin.as_deref());
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=0, must-revalidate"),
    );
    response
}

/// Pick the origin to answer with: echo the request origin when it is
/// allowed, otherwise fall back to the first configured origin.
fn allowed_origin(configured: &[String], request_origin: Option<&str>) -> Option<String> {
    if let Some(origin) = request_origin {
        if configured.iter().any(|allowed| allowed == origin) {
            return Some(origin.to_string());
        }
    }
    configured.first().cloned()
}

fn apply_stream_cors(headers: &mut HeaderMap, allow_origin: Option<&str>) {
    let origin_value = allow_origin
        .and_then(|origin| HeaderValue::from_str(origin).ok())
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range,Content-Type,Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Accept-Ranges,Content-Length,Content-Range"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,OPTIONS"),
    );
}
