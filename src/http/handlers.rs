//! JSON API handlers
//!
//! Login, session verification, catalog listing and stream URL minting.
//! Responses here are JSON and explicitly non-cacheable; the streaming
//! endpoint lives in `streams`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::provider::{is_valid_object_id, ListQuery};
use crate::state::AppState;

use super::middleware::{bearer_token, AuthUser};

/// Collection used when the client does not name one
pub const DEFAULT_COLLECTION: &str = "default";

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Successful login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
    #[serde(rename = "expiresInMs")]
    pub expires_in_ms: i64,
}

/// One catalog entry
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

/// Catalog listing query
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub collection: Option<String>,
}

/// Minted stream URL response
#[derive(Debug, Serialize)]
pub struct StreamUrlResponse {
    pub url: String,
    pub exp: i64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("stream-gate v", env!("CARGO_PKG_VERSION"))
}

/// Cache-defeating headers for authenticated JSON responses.
fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// Login with username and password
/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => ApiError::UnsupportedMediaType,
        _ => ApiError::BadRequest("username and password are required".to_string()),
    })?;

    let (username, password) = match (request.username, request.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username, password)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "username and password are required".to_string(),
            ))
        }
    };

    if !state.credentials.knows(&username) {
        return Err(ApiError::Unauthorized("Unknown user"));
    }
    if !state.credentials.verify(&username, &password) {
        tracing::info!("rejected login for {}", username);
        return Err(ApiError::Unauthorized("Invalid password"));
    }

    let issued = state.tokens.issue(&username, state.config.auth.token_ttl_ms);
    tracing::info!(
        "login for {}, session valid until {}",
        username,
        issued.expires_at_ms
    );

    Ok((
        no_store_headers(),
        Json(LoginResponse {
            token: issued.token,
            user: username,
            expires_in_ms: state.config.auth.token_ttl_ms,
        }),
    )
        .into_response())
}

/// Report whether the presented session token is still valid.
/// Reads only the Authorization header, never the query string.
/// GET /api/auth/verify
pub async fn verify_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let claims = bearer_token(&headers).and_then(|token| state.tokens.verify(&token));
    match claims {
        Some(claims) => (
            no_store_headers(),
            Json(json!({ "ok": true, "user": claims.u })),
        )
            .into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false }))).into_response(),
    }
}

/// List the songs of a collection
/// GET /songs?collection=
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ApiError> {
    let name = query.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
    // An empty container id counts as unconfigured.
    let configured = state
        .config
        .collections
        .get(name)
        .filter(|id| !id.is_empty());
    let container = match configured {
        Some(id) => Some(id.clone()),
        // An unconfigured default collection lists the whole store.
        None if name == DEFAULT_COLLECTION => None,
        None => {
            return Err(ApiError::BadRequest(format!(
                "Collection '{name}' is not configured"
            )))
        }
    };

    let entries = state
        .provider
        .list(&ListQuery { container })
        .await
        .map_err(|err| {
            tracing::error!("catalog listing failed: {}", err);
            ApiError::Backend("Failed to load songs")
        })?;

    let songs: Vec<CatalogEntry> = entries
        .into_iter()
        .map(|entry| CatalogEntry {
            id: entry.id,
            name: entry.name,
        })
        .collect();

    Ok((no_store_headers(), Json(songs)).into_response())
}

/// Mint a short-lived signed stream URL
/// GET /api/stream-url/{id}
pub async fn mint_stream_url(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !is_valid_object_id(&file_id) {
        return Err(ApiError::BadRequest("Invalid id".to_string()));
    }

    let base_url = request_base_url(&headers, &state.config);
    let minted = state.stream_urls.mint(&base_url, &file_id);
    tracing::debug!("stream url for {} minted by {}", file_id, user.0);

    Ok((
        no_store_headers(),
        Json(StreamUrlResponse {
            url: minted.url,
            exp: minted.expires_at_ms,
        }),
    )
        .into_response())
}

/// Absolute base URL as seen by the client, honoring forwarding proxies.
fn request_base_url(headers: &HeaderMap, config: &ServerConfig) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| config.socket_addr());
    format!("{proto}://{host}")
}
