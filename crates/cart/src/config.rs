//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCK_API_URL` - Base URL of the product API (serves `/stock/{id}` and `/products/{id}`)
//!
//! ## Optional
//! - `STOCK_API_TOKEN` - Bearer token for the product API
//! - `STOCK_TIMEOUT_SECS` - Timeout for each stock/catalog lookup (default: 10)
//! - `CART_DATA_DIR` - Directory holding the persisted cart (default: .stockcart)
//! - `CART_STORAGE_KEY` - Versioned key the cart is stored under (default: stockcart:cart:v1)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Key the cart is stored under unless overridden.
///
/// Bump the version suffix when the stored format changes incompatibly.
pub const DEFAULT_STORAGE_KEY: &str = "stockcart:cart:v1";

const DEFAULT_DATA_DIR: &str = ".stockcart";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Product API configuration
    pub stock_api: StockApiConfig,
    /// Directory for the file mirror
    pub data_dir: PathBuf,
    /// Key the cart is stored under
    pub storage_key: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Product API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct StockApiConfig {
    /// Base URL, e.g. `http://localhost:3333`
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-lookup timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for StockApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stock_api = StockApiConfig::from_lookup(&lookup)?;

        let data_dir = PathBuf::from(get_or_default(&lookup, "CART_DATA_DIR", DEFAULT_DATA_DIR));

        let storage_key = get_or_default(&lookup, "CART_STORAGE_KEY", DEFAULT_STORAGE_KEY);
        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            stock_api,
            data_dir,
            storage_key,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
        })
    }
}

impl StockApiConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = Url::parse(&get_required(lookup, "STOCK_API_URL")?).map_err(|e| {
            ConfigError::InvalidEnvVar("STOCK_API_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "STOCK_API_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        let timeout_secs = get_or_default(lookup, "STOCK_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOCK_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOCK_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            token: get_optional(lookup, "STOCK_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable, treating empty values as unset.
fn get_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.is_empty())
}

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}
