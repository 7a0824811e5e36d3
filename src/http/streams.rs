//! Range-aware streaming proxy
//!
//! Serves object bytes from the storage backend without buffering:
//! status and headers are decided from metadata up front, then the body
//! is streamed through chunk by chunk. The client socket applies
//! backpressure, and a dropped connection cancels the backend read.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;

use crate::provider::{is_valid_object_id, ByteRange, ProviderError};
use crate::state::AppState;

use super::range::{resolve, RangeOutcome};

/// Fallback content type for objects without one
const DEFAULT_MIME: &str = "audio/mpeg";

/// Capability parameters on a stream request
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Capability signature
    pub s: Option<String>,
    /// Expiry, epoch milliseconds
    pub exp: Option<String>,
}

/// Stream endpoint errors; plain text, not JSON
#[derive(Debug)]
pub enum StreamError {
    InvalidId,
    Unauthorized,
    Backend(ProviderError),
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self {
            StreamError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid file id").into_response(),
            StreamError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            StreamError::Backend(err) => {
                tracing::error!("stream backend failure: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Stream error").into_response()
            }
        }
    }
}

/// Stream one object, honoring Range requests
/// GET /stream/{id}?s=&exp=
pub async fn stream_object(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    if !is_valid_object_id(&file_id) {
        return Err(StreamError::InvalidId);
    }

    let authorized = match (query.s.as_deref(), parse_expiry(query.exp.as_deref())) {
        (Some(signature), Some(expires_at_ms)) => {
            state.stream_urls.verify(&file_id, expires_at_ms, signature)
        }
        _ => false,
    };
    if !authorized {
        return Err(StreamError::Unauthorized);
    }

    let meta = state
        .provider
        .metadata(&file_id)
        .await
        .map_err(StreamError::Backend)?;
    let mime = meta
        .mime_type
        .as_deref()
        .unwrap_or(DEFAULT_MIME)
        .to_string();
    // A zero size reads as "unknown"; some backends report 0 for
    // objects they cannot stat.
    let size = meta.size.filter(|&size| size > 0);

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    match resolve(range_header, size) {
        RangeOutcome::Unsatisfiable { size } => {
            tracing::debug!("unsatisfiable range for {}: {:?}", file_id, range_header);
            Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response())
        }

        RangeOutcome::Partial { range, size } => {
            let body = open_body(&state, &file_id, Some(range)).await?;
            tracing::debug!(
                "streaming {} bytes {}-{}/{}",
                file_id,
                range.start,
                range.end,
                size
            );
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, mime),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", range.start, range.end, size),
                    ),
                    (header::CONTENT_LENGTH, range.len().to_string()),
                ],
                body,
            )
                .into_response())
        }

        RangeOutcome::Full => {
            let body = open_body(&state, &file_id, None).await?;
            tracing::debug!("streaming {} in full", file_id);
            let mut response = (
                [
                    (header::CONTENT_TYPE, mime),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response();
            if let Some(size) = size {
                response
                    .headers_mut()
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(size));
            }
            Ok(response)
        }
    }
}

/// Open backend content as a response body, logging mid-stream failures.
async fn open_body(
    state: &AppState,
    file_id: &str,
    range: Option<ByteRange>,
) -> Result<Body, StreamError> {
    let stream = state
        .provider
        .content(file_id, range)
        .await
        .map_err(StreamError::Backend)?;
    Ok(Body::from_stream(stream.inspect_err(|err| {
        tracing::warn!("stream interrupted: {}", err);
    })))
}

fn parse_expiry(exp: Option<&str>) -> Option<i64> {
    exp.and_then(|raw| raw.parse().ok())
}
