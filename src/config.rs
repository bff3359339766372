use crate::auth::nonce::DEFAULT_NONCE_TTL_SECS;
use crate::auth::session::DEFAULT_SESSION_TTL_SECS;
use std::env;
use std::net::SocketAddr;

/// Minimum length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bound for either TTL (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct Config {
    // Token signing
    pub jwt_secret: String,

    // Server
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,

    // Shared storage; in-process when unset
    pub redis_url: Option<String>,

    // TTLs (in seconds)
    pub nonce_ttl_secs: u64,
    pub session_ttl_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("nonce_ttl_secs", &self.nonce_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        if jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        // TTLs
        let nonce_ttl_secs = parse_env_or_default("NONCE_TTL_SECS", DEFAULT_NONCE_TTL_SECS)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;

        validate_ttl("NONCE_TTL_SECS", nonce_ttl_secs)?;
        validate_ttl("SESSION_TTL_SECS", session_ttl_secs)?;

        Ok(Config {
            jwt_secret,
            bind_addr,
            cors_allowed_origins,
            redis_url,
            nonce_ttl_secs,
            session_ttl_secs,
        })
    }
}

fn validate_ttl(key: &str, ttl_secs: u64) -> Result<(), ConfigError> {
    if ttl_secs == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    if ttl_secs > MAX_TTL_SECS {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be at most {} seconds", MAX_TTL_SECS),
        ));
    }
    Ok(())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
