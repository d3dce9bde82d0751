//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present).

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub relay: ServerConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Relay server bind configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_relay_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Durable message store endpoint
///
/// The relay never talks to the store; this section configures the client
/// session's REST calls.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_base_url")]
    pub base_url: String,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

/// CORS configuration for the relay's HTTP surface
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "homelink".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_relay_port() -> u16 {
    3002
}

fn default_store_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error when a variable is present but unparsable; missing
    /// variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            relay: ServerConfig {
                host: env::var("RELAY_HOST").unwrap_or_else(|_| default_host()),
                port: parse_or_default("RELAY_PORT", default_relay_port())?,
            },
            store: StoreConfig {
                base_url: env::var("STORE_BASE_URL").unwrap_or_else(|_| default_store_base_url()),
                timeout_secs: parse_or_default("STORE_TIMEOUT_SECS", default_store_timeout_secs())?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| s.split(',').map(str::trim).map(String::from).collect())
                    .unwrap_or_else(default_allowed_origins),
            },
        })
    }
}

/// Parse an env var, falling back to a default when unset and erroring when
/// set to something unparsable
fn parse_or_default<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
