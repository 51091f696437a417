//! Configuration management for the server.

use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Model declarations: a JSON file or a directory of them
    pub models_path: PathBuf,
    /// Snapshot file the store persists to
    pub storage_path: PathBuf,
    /// Token signing secret; auth is enabled when set
    pub auth_secret: Option<String>,
    /// Token lifetime in seconds; tokens never expire when unset
    pub token_ttl_secs: Option<u64>,
    /// Path prefix for the REST routes, e.g. `/api`
    pub api_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let models_path = env::var("MODELS_PATH")
            .unwrap_or_else(|_| "models.json".to_string())
            .into();

        let storage_path = env::var("STORAGE_PATH")
            .unwrap_or_else(|_| "db.json".to_string())
            .into();

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let token_ttl_secs = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidTokenTtl)?),
            Err(_) => None,
        };

        let api_prefix = normalize_prefix(&env::var("API_PREFIX").unwrap_or_default());

        Ok(Self {
            host,
            port,
            models_path,
            storage_path,
            auth_secret,
            token_ttl_secs,
            api_prefix,
        })
    }

    /// Whether requests must carry a bearer token.
    pub fn auth_enabled(&self) -> bool {
        self.auth_secret.is_some()
    }
}

/// `"api/"` and `"/api"` both become `"/api"`; blank becomes `""`.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid TOKEN_TTL_SECS value")]
    InvalidTokenTtl,

    #[error("Cannot read models from {path}: {message}")]
    ModelSource { path: PathBuf, message: String },

    #[error("Invalid models: {0}")]
    Schema(#[from] mockbase_engine::Error),
}
