//! Signed streaming gateway
//!
//! Authenticates listeners, mints short-lived signed stream URLs and
//! proxies ranged audio reads from a remote object store, so clients
//! never talk to the store directly.

mod auth;
mod config;
mod config_file;
mod error;
mod http;
mod limits;
mod provider;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::http::create_router;
use crate::provider::drive::DriveProvider;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "stream-gate";

/// Idle rate-limit buckets are dropped after this long.
const LIMITER_SWEEP_AGE: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let mut config = if std::path::Path::new(&config_path).exists() {
        match crate::config_file::ConfigFile::from_file(&config_path) {
            Ok(cf) => cf.into_server_config(),
            Err(e) => {
                tracing::warn!(
                    "Failed to load config file {}: {}. Using defaults.",
                    config_path,
                    e
                );
                ServerConfig::default()
            }
        }
    } else {
        ServerConfig::default()
    };
    config.apply_env_overrides();
    tracing::info!("Configuration loaded: {:?}", config);

    if config.auth.secret == crate::config::DEV_SECRET {
        tracing::warn!("running with the built-in development secret; set AUTH_SECRET");
    }
    if config.users.is_empty() {
        tracing::warn!("no users configured; every login will fail");
    }
    tracing::info!(
        "collections: {:?}",
        config.collections.keys().collect::<Vec<_>>()
    );

    // Storage backend
    let provider = match DriveProvider::new(&config.provider) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::error!("failed to build storage client: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), provider));
    spawn_limiter_sweeper(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config.socket_addr().parse().unwrap();
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

/// Drop idle rate-limit buckets periodically.
fn spawn_limiter_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_SWEEP_AGE);
        loop {
            ticker.tick().await;
            state.api_limiter.cleanup(LIMITER_SWEEP_AGE);
            state.login_limiter.cleanup(LIMITER_SWEEP_AGE);
            state.mint_limiter.cleanup(LIMITER_SWEEP_AGE);
        }
    });
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
