//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config::{AuthConfig, LimitsConfig, ProviderConfig, ServerConfig, DEV_SECRET};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Signing and session settings
    pub auth: Option<AuthSettings>,
    /// Storage backend settings
    pub provider: Option<ProviderSettings>,
    /// CORS settings
    pub cors: Option<CorsSettings>,
    /// username -> argon2 PHC hash
    pub users: Option<HashMap<String, String>>,
    /// collection name -> backend container id
    pub collections: Option<HashMap<String, String>>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Rate limit settings
    pub limits: Option<LimitsSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Current signing secret
    pub secret: Option<String>,
    /// Previous signing secret, accepted during rotation
    pub previous_secret: Option<String>,
    /// Session token lifetime in milliseconds
    pub token_ttl_ms: Option<i64>,
    /// Signed stream URL lifetime in milliseconds
    pub stream_url_ttl_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the Drive-style REST API
    pub base_url: Option<String>,
    /// Static bearer token for backend requests
    pub api_token: Option<String>,
    /// Listing page size
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Budget for API and stream requests, per minute
    pub api_per_minute: Option<u32>,
    /// Budget for login attempts, per minute
    pub login_per_minute: Option<u32>,
    /// Budget for stream URL minting, per minute
    pub mint_per_minute: Option<u32>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            auth: Some(AuthSettings {
                secret: Some(DEV_SECRET.to_string()),
                previous_secret: None,
                token_ttl_ms: Some(7 * 24 * 60 * 60 * 1000),
                stream_url_ttl_ms: Some(60_000),
            }),
            provider: Some(ProviderSettings {
                base_url: Some("https://www.googleapis.com/drive/v3".to_string()),
                api_token: None,
                page_size: Some(100),
            }),
            cors: Some(CorsSettings {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            }),
            users: Some(HashMap::new()),
            collections: Some(HashMap::new()),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
            }),
            limits: Some(LimitsSettings {
                api_per_minute: Some(120),
                login_per_minute: Some(10),
                mint_per_minute: Some(180),
            }),
        }
    }

    /// Convert to ServerConfig, filling gaps with defaults
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let auth = self.auth.unwrap_or_default();
        let provider = self.provider.unwrap_or_default();
        let limits = self.limits.unwrap_or_default();

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            allowed_origins: self
                .cors
                .map(|cors| cors.allowed_origins)
                .unwrap_or(defaults.allowed_origins),
            auth: AuthConfig {
                secret: auth.secret.unwrap_or(defaults.auth.secret),
                previous_secret: auth.previous_secret,
                token_ttl_ms: auth.token_ttl_ms.unwrap_or(defaults.auth.token_ttl_ms),
                stream_url_ttl_ms: auth
                    .stream_url_ttl_ms
                    .unwrap_or(defaults.auth.stream_url_ttl_ms),
            },
            provider: ProviderConfig {
                base_url: provider.base_url.unwrap_or(defaults.provider.base_url),
                api_token: provider.api_token,
                page_size: provider.page_size.unwrap_or(defaults.provider.page_size),
            },
            limits: LimitsConfig {
                api_per_minute: limits
                    .api_per_minute
                    .unwrap_or(defaults.limits.api_per_minute),
                login_per_minute: limits
                    .login_per_minute
                    .unwrap_or(defaults.limits.login_per_minute),
                mint_per_minute: limits
                    .mint_per_minute
                    .unwrap_or(defaults.limits.mint_per_minute),
            },
            users: self.users.unwrap_or_default(),
            collections: self.collections.unwrap_or_default(),
            log_level: self
                .logging
                .map(|logging| logging.level)
                .unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.auth.is_some());
        assert!(config.provider.is_some());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let mut config = ConfigFile::default_config();
        config.users = Some(HashMap::from([(
            "yorben".to_string(),
            "$argon2id$v=19$m=19456,t=2,p=1$salt$hash".to_string(),
        )]));
        config.collections = Some(HashMap::from([(
            "default".to_string(),
            "folder-0123456789".to_string(),
        )]));

        let temp_file = NamedTempFile::new().unwrap();
        config.to_file(temp_file.path()).unwrap();
        let loaded = ConfigFile::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.server.host, config.server.host);
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(loaded.users, config.users);
        assert_eq!(loaded.collections, config.collections);
    }

    #[test]
    fn minimal_file_falls_back_to_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[server]\nhost = \"127.0.0.1\"\nport = 8080\n").unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_server_config();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.secret, DEV_SECRET);
        assert_eq!(config.limits.login_per_minute, 10);
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
        assert!(config.collections.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"
[server]
host = "0.0.0.0"
port = 5000

[auth]
secret = "file-secret"
stream_url_ttl_ms = 30000

[cors]
allowed_origins = ["https://radio.example"]

[limits]
login_per_minute = 3

[collections]
default = "folder-0123456789"
podcasts = "folder-9876543210"
"#
        )
        .unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_server_config();
        assert_eq!(config.auth.secret, "file-secret");
        assert_eq!(config.auth.stream_url_ttl_ms, 30_000);
        // Unset fields keep their defaults.
        assert_eq!(config.auth.token_ttl_ms, 7 * 24 * 60 * 60 * 1000);
        assert_eq!(config.allowed_origins, vec!["https://radio.example"]);
        assert_eq!(config.limits.login_per_minute, 3);
        assert_eq!(config.limits.api_per_minute, 120);
        assert_eq!(config.collections.len(), 2);
        assert_eq!(
            config.collections.get("default").map(String::as_str),
            Some("folder-0123456789")
        );
    }

    #[test]
    fn test_invalid_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "this is not valid toml [[[").unwrap();
        assert!(ConfigFile::from_file(temp_file.path()).is_err());
    }
}
