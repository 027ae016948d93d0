//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `TIENDA_BACKEND_URL` - Backend base URL (default: `http://127.0.0.1:8000`)
//! - `TIENDA_DATA_DIR` - Directory for the local `user`/`cart`/`orders` records (default: `.tienda`)
//! - `TIENDA_TAX_RATE` - Flat tax rate (default: 0.21)
//! - `TIENDA_CATEGORY_TAX_RATES` - Per-category overrides, e.g. `Electrónica=0.10,Libros=0`
//! - `TIENDA_SHIPPING_FEE` - Flat shipping fee for a non-empty cart (default: 50)
//! - `TIENDA_CART_ON_LOAD` - `restore` or `clear` the saved cart at startup (default: restore)
//! - `TIENDA_HTTP_TIMEOUT_SECS` - Backend request timeout (default: none)
//! - `TIENDA_CATALOG_CACHE_SECS` - Catalog cache TTL (default: 300)
//! - `TIENDA_DATABASE_URL` - `PostgreSQL` connection string, falls back to `DATABASE_URL`

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use tienda_core::{Category, Price};

use crate::services::cart::{Pricing, TaxPolicy};

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_DATA_DIR: &str = ".tienda";
const DEFAULT_CATALOG_CACHE_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What to do with the persisted cart when the application starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartOnLoad {
    /// Rehydrate the saved cart.
    #[default]
    Restore,
    /// Discard the saved cart.
    Clear,
}

impl FromStr for CartOnLoad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restore" => Ok(Self::Restore),
            "clear" => Ok(Self::Clear),
            other => Err(format!("expected 'restore' or 'clear', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend connection settings
    pub backend: BackendConfig,
    /// Directory holding the local records
    pub data_dir: PathBuf,
    /// Tax and shipping
    pub pricing: Pricing,
    /// Saved-cart policy at startup
    pub cart_on_load: CartOnLoad,
    /// `PostgreSQL` order store (contains password)
    pub database_url: Option<SecretString>,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; endpoint paths are joined onto it
    pub base_url: Url,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// How long catalog responses are cached
    pub catalog_cache_ttl: Duration,
}

impl BackendConfig {
    /// Settings for `base_url` with no timeout and the default cache TTL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_SECS),
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
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set to an
    /// unparseable or out-of-range value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_source(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_env(&env, "TIENDA_BACKEND_URL", DEFAULT_BACKEND_URL)?;
        let timeout = match get_optional_env(&env, "TIENDA_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_positive_secs(
                "TIENDA_HTTP_TIMEOUT_SECS",
                &raw,
            )?)),
            None => None,
        };
        let cache_secs: u64 = parse_env(
            &env,
            "TIENDA_CATALOG_CACHE_SECS",
            &DEFAULT_CATALOG_CACHE_SECS.to_string(),
        )?;

        let data_dir = PathBuf::from(get_env_or_default(&env, "TIENDA_DATA_DIR", DEFAULT_DATA_DIR));
        let cart_on_load = parse_env(&env, "TIENDA_CART_ON_LOAD", "restore")?;

        Ok(Self {
            backend: BackendConfig {
                base_url,
                timeout,
                catalog_cache_ttl: Duration::from_secs(cache_secs),
            },
            data_dir,
            pricing: pricing_from(&env)?,
            cart_on_load,
            database_url: get_database_url(&env),
        })
    }

    /// The database URL, required by the `PostgreSQL` order store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no URL is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("TIENDA_DATABASE_URL".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn pricing_from(env: &impl Fn(&str) -> Option<String>) -> Result<Pricing, ConfigError> {
    let default_rate = match get_optional_env(env, "TIENDA_TAX_RATE") {
        Some(raw) => parse_rate("TIENDA_TAX_RATE", &raw)?,
        None => TaxPolicy::STANDARD_RATE,
    };
    let mut tax = TaxPolicy::flat(default_rate);
    if let Some(raw) = get_optional_env(env, "TIENDA_CATEGORY_TAX_RATES") {
        for (category, rate) in parse_category_rates(&raw)? {
            tax = tax.with_category_rate(category, rate);
        }
    }

    let shipping_fee = match get_optional_env(env, "TIENDA_SHIPPING_FEE") {
        Some(raw) => Price::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("TIENDA_SHIPPING_FEE".to_string(), e.to_string()))?,
        None => Pricing::STANDARD_SHIPPING,
    };

    Ok(Pricing { tax, shipping_fee })
}

/// Parse `Category=rate` pairs separated by commas.
fn parse_category_rates(raw: &str) -> Result<Vec<(Category, Decimal)>, ConfigError> {
    const KEY: &str = "TIENDA_CATEGORY_TAX_RATES";
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (category, rate) = pair.split_once('=').ok_or_else(|| {
                ConfigError::InvalidEnvVar(KEY.to_string(), format!("expected Category=rate, got '{pair}'"))
            })?;
            let category = Category::new(category)
                .map_err(|e| ConfigError::InvalidEnvVar(KEY.to_string(), e.to_string()))?;
            Ok((category, parse_rate(KEY, rate)?))
        })
        .collect()
}

/// A rate between 0 and 1 inclusive.
fn parse_rate(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let rate = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("rate must be between 0 and 1 (got {rate})"),
        ));
    }
    Ok(rate)
}

fn parse_positive_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(env: &impl Fn(&str) -> Option<String>) -> Option<SecretString> {
    get_optional_env(env, "TIENDA_DATABASE_URL")
        .or_else(|| get_optional_env(env, "DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Blank counts as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
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
        StorefrontConfig::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.backend.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.backend.timeout, None);
        assert_eq!(config.backend.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.data_dir, PathBuf::from(".tienda"));
        assert_eq!(config.cart_on_load, CartOnLoad::Restore);
        assert_eq!(config.pricing, Pricing::default());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TIENDA_BACKEND_URL", "https://api.example.com/v1"),
            ("TIENDA_DATA_DIR", "/tmp/tienda"),
            ("TIENDA_TAX_RATE", "0.10"),
            ("TIENDA_SHIPPING_FEE", "75.5"),
            ("TIENDA_CART_ON_LOAD", "Clear"),
            ("TIENDA_HTTP_TIMEOUT_SECS", "15"),
            ("TIENDA_CATALOG_CACHE_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.backend.base_url.host_str(), Some("api.example.com"));
        assert_eq!(config.backend.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.backend.catalog_cache_ttl, Duration::ZERO);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tienda"));
        assert_eq!(config.pricing.tax.default_rate(), Decimal::new(10, 2));
        assert_eq!(config.pricing.shipping_fee, Price::parse("75.5").unwrap());
        assert_eq!(config.cart_on_load, CartOnLoad::Clear);
    }

    #[test]
    fn test_category_rates() {
        let config = load(&[("TIENDA_CATEGORY_TAX_RATES", "Electrónica=0.10, Libros=0")]).unwrap();
        let tax = &config.pricing.tax;
        assert_eq!(tax.default_rate(), TaxPolicy::STANDARD_RATE);
        assert_eq!(
            tax.rate_for(Some(&Category::new("Electrónica").unwrap())),
            Decimal::new(10, 2)
        );
        assert_eq!(tax.rate_for(Some(&Category::new("Libros").unwrap())), Decimal::ZERO);
        assert_eq!(
            tax.rate_for(Some(&Category::new("Ropa").unwrap())),
            TaxPolicy::STANDARD_RATE
        );
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("TIENDA_BACKEND_URL", "not a url"),
            ("TIENDA_TAX_RATE", "1.5"),
            ("TIENDA_TAX_RATE", "-0.1"),
            ("TIENDA_CATEGORY_TAX_RATES", "Electrónica"),
            ("TIENDA_CATEGORY_TAX_RATES", "=0.1"),
            ("TIENDA_SHIPPING_FEE", "-1"),
            ("TIENDA_CART_ON_LOAD", "keep"),
            ("TIENDA_HTTP_TIMEOUT_SECS", "0"),
            ("TIENDA_CATALOG_CACHE_SECS", "soon"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEnvVar(k, _) if k == key),
                "{key}={value} gave {err}"
            );
        }
    }

    #[test]
    fn test_database_url_fallback_and_redaction() {
        let config = load(&[("DATABASE_URL", "postgres://u:hunter2@db/tienda")]).unwrap();
        assert!(config.require_database_url().is_ok());
        assert!(!format!("{config:?}").contains("hunter2"));

        let config = load(&[]).unwrap();
        assert!(matches!(
            config.require_database_url(),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_blank_counts_as_unset() {
        let config = load(&[("TIENDA_TAX_RATE", "  "), ("TIENDA_DATA_DIR", "")]).unwrap();
        assert_eq!(config.pricing.tax.default_rate(), TaxPolicy::STANDARD_RATE);
        assert_eq!(config.data_dir, PathBuf::from(".tienda"));
    }
}
