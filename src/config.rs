//! Server configuration

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Built-in development secret; override via config file or AUTH_SECRET.
pub const DEV_SECRET: &str = "dev-secret-change-me";

/// Signing and session settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Current signing secret
    pub secret: String,

    /// Previous signing secret, accepted during rotation
    pub previous_secret: Option<String>,

    /// Session token lifetime in milliseconds
    pub token_ttl_ms: i64,

    /// Signed stream URL lifetime in milliseconds
    pub stream_url_ttl_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            previous_secret: None,
            token_ttl_ms: 7 * 24 * 60 * 60 * 1000, // 7 days
            stream_url_ttl_ms: 60_000,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field(
                "previous_secret",
                &self.previous_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("token_ttl_ms", &self.token_ttl_ms)
            .field("stream_url_ttl_ms", &self.stream_url_ttl_ms)
            .finish()
    }
}

/// Storage backend settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Drive-style REST API
    pub base_url: String,

    /// Static bearer token for backend requests
    pub api_token: Option<String>,

    /// Listing page size
    pub page_size: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            api_token: None,
            page_size: 100,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Per-minute request budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Budget for API and stream requests
    pub api_per_minute: u32,

    /// Budget for login attempts
    pub login_per_minute: u32,

    /// Budget for stream URL minting
    pub mint_per_minute: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            api_per_minute: 120,
            login_per_minute: 10,
            mint_per_minute: 180,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,

    /// Signing and session settings
    pub auth: AuthConfig,

    /// Storage backend settings
    pub provider: ProviderConfig,

    /// Rate limit budgets
    pub limits: LimitsConfig,

    /// username -> argon2 PHC hash
    pub users: HashMap<String, String>,

    /// collection name -> backend container id
    pub collections: HashMap<String, String>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            auth: AuthConfig::default(),
            provider: ProviderConfig::default(),
            limits: LimitsConfig::default(),
            users: HashMap::new(),
            collections: HashMap::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pull secrets from the environment when set.
    ///
    /// Deployments keep AUTH_SECRET, AUTH_SECRET_PREV and
    /// PROVIDER_API_TOKEN out of the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("AUTH_SECRET") {
            if !secret.is_empty() {
                self.auth.secret = secret;
            }
        }
        if let Ok(previous) = std::env::var("AUTH_SECRET_PREV") {
            if !previous.is_empty() {
                self.auth.previous_secret = Some(previous);
            }
        }
        if let Ok(token) = std::env::var("PROVIDER_API_TOKEN") {
            if !token.is_empty() {
                self.provider.api_token = Some(token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.auth.secret, DEV_SECRET);
        assert_eq!(config.auth.stream_url_ttl_ms, 60_000);
        assert_eq!(config.limits.login_per_minute, 10);
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = ServerConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.socket_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("AUTH_SECRET", "env-secret");
        std::env::set_var("AUTH_SECRET_PREV", "env-prev");
        std::env::set_var("PROVIDER_API_TOKEN", "env-token");

        let mut config = ServerConfig::default();
        config.apply_env_overrides();

        std::env::remove_var("AUTH_SECRET");
        std::env::remove_var("AUTH_SECRET_PREV");
        std::env::remove_var("PROVIDER_API_TOKEN");

        assert_eq!(config.auth.secret, "env-secret");
        assert_eq!(config.auth.previous_secret.as_deref(), Some("env-prev"));
        assert_eq!(config.provider.api_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = ServerConfig::default();
        config.provider.api_token = Some("super-secret-token".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(DEV_SECRET));
        assert!(!rendered.contains("super-secret-token"));
    }
}
