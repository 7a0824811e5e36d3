//! Per-client rate limiting
//!
//! Token buckets keyed by client address, one limiter per route group.
//! Budgets are per minute and buckets refill continuously.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use parking_lot::RwLock;

/// Token bucket with fractional refill
///
/// Tokens accrue continuously, so low per-minute budgets never stall
/// on integer truncation.
#[derive(Debug)]
struct TokenBucket {
    max_tokens: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(per_minute: u32) -> Self {
        let max = per_minute as f64;
        Self {
            max_tokens: max,
            tokens: max,
            refill_per_sec: max / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        self.last_refill = now;
    }
}

/// Per-client request budget for one route group
#[derive(Debug)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, TokenBucket>>,
    requests_per_minute: u32,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            requests_per_minute,
        }
    }

    /// Take one token for `key`; false means the budget is spent.
    pub fn is_allowed(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.requests_per_minute));
        bucket.try_consume()
    }

    /// Drop buckets that have not been touched for `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.write();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < max_age);
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }
}

/// Client key for bucketing: the first forwarded address when running
/// behind a proxy, otherwise the peer address.
pub fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let key = client_key(&request);

    if !limiter.is_allowed(&key) {
        tracing::warn!("rate limit exceeded for {}", key);
        return Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"));
    }

    Ok(next.run(request).await)
}
