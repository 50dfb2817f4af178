//! Service configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use points_ledger_core::DEFAULT_ADMIN_WELCOME_BONUS;
use points_ledger_store::DEFAULT_MAX_ATTEMPTS;

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local, lost on restart.
    Memory,
    /// `RocksDB` under `data_dir`. Requires the `rocksdb-backend` feature.
    Rocksdb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::Rocksdb),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Rocksdb => f.write_str("rocksdb"),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/points-ledger").
    pub data_dir: String,

    /// Storage backend (default: memory).
    pub store_backend: StoreBackend,

    /// HS256 secret used to validate identity provider tokens.
    /// User endpoints reject every request while unset.
    pub auth_jwt_secret: Option<String>,

    /// Expected JWT issuer.
    pub auth_issuer: String,

    /// Expected JWT audience (default: "points-ledger").
    pub auth_audience: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Email that becomes admin on first account creation.
    pub bootstrap_admin_email: Option<String>,

    /// Points granted to the bootstrap admin.
    pub admin_welcome_bonus: i64,

    /// Attempts per ledger operation before reporting contention.
    pub max_transaction_attempts: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Auth secrets file structure.
#[derive(Debug, Deserialize)]
struct AuthSecrets {
    jwt_secret: String,
    #[serde(default)]
    service_api_key: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Try to load auth secrets from file first, then fall back to env vars
        let (auth_jwt_secret, service_api_key) = load_auth_secrets();

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to memory store");
                StoreBackend::Memory
            }),
            Err(_) => defaults.store_backend,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            store_backend,
            auth_jwt_secret,
            auth_issuer: std::env::var("AUTH_ISSUER").unwrap_or(defaults.auth_issuer),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            service_api_key,
            bootstrap_admin_email: std::env::var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            admin_welcome_bonus: parse_env("ADMIN_WELCOME_BONUS")
                .unwrap_or(defaults.admin_welcome_bonus),
            max_transaction_attempts: parse_env("MAX_TRANSACTION_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_transaction_attempts),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Whether `email` is the configured bootstrap admin identity.
    #[must_use]
    pub fn is_bootstrap_admin(&self, email: Option<&str>) -> bool {
        match (self.bootstrap_admin_email.as_deref(), email) {
            (Some(admin), Some(email)) => admin.trim().eq_ignore_ascii_case(email.trim()),
            _ => false,
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load auth secrets from file or environment.
fn load_auth_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/auth.json",
        "points-ledger/.secrets/auth.json",
        "../.secrets/auth.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AuthSecrets>(path) {
            tracing::info!(path = %path, "Loaded auth secrets from file");
            return (
                Some(secrets.jwt_secret),
                secrets
                    .service_api_key
                    .or_else(|| std::env::var("SERVICE_API_KEY").ok()),
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Auth secrets file not found, using environment variables");
    (
        std::env::var("AUTH_JWT_SECRET").ok(),
        std::env::var("SERVICE_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/points-ledger".into(),
            store_backend: StoreBackend::Memory,
            auth_jwt_secret: None,
            auth_issuer: "https://auth.localhost".into(),
            auth_audience: "points-ledger".into(),
            service_api_key: None,
            bootstrap_admin_email: None,
            admin_welcome_bonus: DEFAULT_ADMIN_WELCOME_BONUS,
            max_transaction_attempts: DEFAULT_MAX_ATTEMPTS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("RocksDB".parse::<StoreBackend>(), Ok(StoreBackend::Rocksdb));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn bootstrap_admin_match_ignores_case() {
        let config = ServiceConfig {
            bootstrap_admin_email: Some("Owner@Example.com".into()),
            ..ServiceConfig::default()
        };

        assert!(config.is_bootstrap_admin(Some("owner@example.com")));
        assert!(!config.is_bootstrap_admin(Some("someone@example.com")));
        assert!(!config.is_bootstrap_admin(None));
        assert!(!ServiceConfig::default().is_bootstrap_admin(Some("owner@example.com")));
    }

    #[test]
    fn defaults_are_usable() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_transaction_attempts, 5);
        assert_eq!(config.admin_welcome_bonus, 1000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }
}
