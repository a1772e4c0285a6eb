//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REKLAMA_API_URL` - Base URL of the storefront REST API
//!
//! ## Optional
//! - `REKLAMA_ORIGIN_URL` - Where the payment page returns the customer (default: <http://localhost:3000>)
//! - `REKLAMA_DATA_DIR` - Directory for the cart and preferences (default: .reklama)
//! - `REKLAMA_API_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `REKLAMA_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `REKLAMA_PAYMENT_POLL_ATTEMPTS` - Payment status queries before giving up (default: 5)
//! - `REKLAMA_PAYMENT_POLL_INTERVAL_MS` - Delay between payment status queries (default: 2000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// REST API settings
    pub api: ApiConfig,
    /// URL the hosted payment page redirects back to
    pub origin_url: Url,
    /// Directory holding the persisted cart and preferences
    pub data_dir: PathBuf,
    /// Payment confirmation polling
    pub payment_poll: PaymentPollConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// REST API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API base URL; endpoints live under `{base_url}/api/`
    pub base_url: Url,
    /// Timeout for a single request
    pub request_timeout: Duration,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
}

/// Payment status polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPollConfig {
    /// Status queries made before the outcome is reported as unknown
    pub max_attempts: u32,
    /// Delay between queries
    pub interval: Duration,
}

impl Default for PaymentPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(2),
        }
    }
}

impl StorefrontConfig {
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

        Self::from_source(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    fn from_source(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_source(env)?;
        let origin_url = parse_url(
            "REKLAMA_ORIGIN_URL",
            &get_env_or_default(env, "REKLAMA_ORIGIN_URL", "http://localhost:3000"),
        )?;
        let data_dir = PathBuf::from(get_env_or_default(env, "REKLAMA_DATA_DIR", ".reklama"));
        let payment_poll = PaymentPollConfig::from_source(env)?;

        Ok(Self {
            api,
            origin_url,
            data_dir,
            payment_poll,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_source(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_url("REKLAMA_API_URL", &get_required_env(env, "REKLAMA_API_URL")?)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "REKLAMA_API_URL".to_string(),
                "must be a hierarchical URL such as https://api.example.com".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(parse_env(env, "REKLAMA_API_TIMEOUT_SECS", 15)?),
            catalog_cache_ttl: Duration::from_secs(parse_env(
                env,
                "REKLAMA_CATALOG_CACHE_TTL_SECS",
                300,
            )?),
        })
    }
}

impl PaymentPollConfig {
    fn from_source(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_attempts: u32 =
            parse_env(env, "REKLAMA_PAYMENT_POLL_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REKLAMA_PAYMENT_POLL_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let interval_ms: u64 = parse_env(env, "REKLAMA_PAYMENT_POLL_INTERVAL_MS", 2000)?;

        Ok(Self {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(env, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable; blank values count as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(env, key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_source(&|key: &str| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("REKLAMA_API_URL", "http://localhost:8001")]).unwrap();

        assert_eq!(config.api.base_url.as_str(), "http://localhost:8001/");
        assert_eq!(config.api.request_timeout, Duration::from_secs(15));
        assert_eq!(config.api.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.origin_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.data_dir, PathBuf::from(".reklama"));
        assert_eq!(config.payment_poll, PaymentPollConfig::default());
        assert_eq!(config.sentry_dsn, None);
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "REKLAMA_API_URL"));
    }

    #[test]
    fn test_blank_api_url_is_missing() {
        let err = load(&[("REKLAMA_API_URL", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_api_url() {
        let err = load(&[("REKLAMA_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "REKLAMA_API_URL"));

        let err = load(&[("REKLAMA_API_URL", "mailto:shop@example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("REKLAMA_API_URL", "https://api.reklama.uz"),
            ("REKLAMA_ORIGIN_URL", "https://reklama.uz"),
            ("REKLAMA_DATA_DIR", "/var/lib/reklama"),
            ("REKLAMA_CATALOG_CACHE_TTL_SECS", "60"),
            ("REKLAMA_PAYMENT_POLL_ATTEMPTS", "10"),
            ("REKLAMA_PAYMENT_POLL_INTERVAL_MS", "500"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ])
        .unwrap();

        assert_eq!(config.origin_url.as_str(), "https://reklama.uz/");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/reklama"));
        assert_eq!(config.api.catalog_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.payment_poll.max_attempts, 10);
        assert_eq!(config.payment_poll.interval, Duration::from_millis(500));
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_zero_poll_attempts_rejected() {
        let err = load(&[
            ("REKLAMA_API_URL", "http://localhost:8001"),
            ("REKLAMA_PAYMENT_POLL_ATTEMPTS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_non_numeric_interval_rejected() {
        let err = load(&[
            ("REKLAMA_API_URL", "http://localhost:8001"),
            ("REKLAMA_PAYMENT_POLL_INTERVAL_MS", "2s"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "REKLAMA_PAYMENT_POLL_INTERVAL_MS")
        );
    }
}
