//! Configuration for the Turnstile API service.

use std::time::Duration;

use turnstile_auth_core::AuthConfig;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL
    pub database_url: String,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Bootstrap account
    pub account: AccountConfig,

    /// Period of the expired-nonce sweep
    pub sweep_interval: Duration,

    /// Request timeout
    pub request_timeout: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

/// The single account accepted by the login endpoint
#[derive(Clone)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        // Database
        let database_url = required("DATABASE_URL")?;

        // Server
        let http_port = parse_or(&lookup, "HTTP_PORT", 8080u16)?;
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;
        let sweep_interval_secs = parse_or(&lookup, "SWEEP_INTERVAL_SECS", 60u64)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("SWEEP_INTERVAL_SECS"));
        }

        // Shared secret (minimum 32 bytes)
        let secret = required("AUTH_SECRET_KEY")?;
        if secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "AUTH_SECRET_KEY must be at least 32 bytes",
            ));
        }

        // Bootstrap account
        let account = AccountConfig {
            username: required("AUTH_USER")?,
            password: required("AUTH_PASSWORD")?,
            role: lookup("AUTH_ROLE").unwrap_or_else(|| "admin".to_string()),
        };

        // Lifetimes
        let access_ttl = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", 86_400u64)?;
        let refresh_ttl = parse_or(&lookup, "REFRESH_TOKEN_TTL_SECS", 2_592_000u64)?;
        let nonce_ttl = parse_or(&lookup, "NONCE_TTL_SECS", 120u64)?;
        let max_skew = parse_or(&lookup, "MAX_CLOCK_SKEW_SECS", 60u64)?;
        let store_timeout = parse_or(&lookup, "STORE_TIMEOUT_SECS", 5u64)?;
        let issuer = lookup("TOKEN_ISSUER").unwrap_or_else(|| AuthConfig::DEFAULT_ISSUER.to_string());

        // Metrics
        let metrics_enabled = lookup("METRICS_ENABLED")
            .map(|v| v.parse().unwrap_or(true))
            .unwrap_or(true);

        // Build auth config
        let auth = AuthConfig::new(secret)
            .with_issuer(issuer)
            .with_access_token_ttl(Duration::from_secs(access_ttl))
            .with_refresh_token_ttl(Duration::from_secs(refresh_ttl))
            .with_nonce_ttl(Duration::from_secs(nonce_ttl))
            .with_max_clock_skew(Duration::from_secs(max_skew))
            .with_store_timeout(Duration::from_secs(store_timeout));
        auth.validate()
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?;

        Ok(Self {
            http_port,
            database_url,
            auth,
            account,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
