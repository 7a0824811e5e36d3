//! Application state
//!
//! Shared, immutable wiring: signing authorities, the credential store,
//! the storage provider and the rate limiters. Handlers receive it as
//! `Arc<AppState>`.

use std::sync::Arc;

use crate::auth::capability::StreamUrlSigner;
use crate::auth::password::CredentialStore;
use crate::auth::tokens::TokenAuthority;
use crate::config::ServerConfig;
use crate::limits::RateLimiter;
use crate::provider::RemoteObjectProvider;

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Session token authority
    pub tokens: TokenAuthority,

    /// Stream URL signer
    pub stream_urls: StreamUrlSigner,

    /// Login credential store
    pub credentials: CredentialStore,

    /// Remote storage backend
    pub provider: Arc<dyn RemoteObjectProvider>,

    /// Budget for API and stream requests
    pub api_limiter: Arc<RateLimiter>,

    /// Budget for login attempts
    pub login_limiter: Arc<RateLimiter>,

    /// Budget for stream URL minting
    pub mint_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create a new AppState from configuration and a storage backend
    pub fn new(config: ServerConfig, provider: Arc<dyn RemoteObjectProvider>) -> Self {
        let tokens = TokenAuthority::new(
            config.auth.secret.clone(),
            config.auth.previous_secret.clone(),
        );
        let stream_urls =
            StreamUrlSigner::new(config.auth.secret.clone(), config.auth.stream_url_ttl_ms);
        let credentials = CredentialStore::new(config.users.clone());

        Self {
            tokens,
            stream_urls,
            credentials,
            provider,
            api_limiter: Arc::new(RateLimiter::new(config.limits.api_per_minute)),
            login_limiter: Arc::new(RateLimiter::new(config.limits.login_per_minute)),
            mint_limiter: Arc::new(RateLimiter::new(config.limits.mint_per_minute)),
            config,
        }
    }
}
