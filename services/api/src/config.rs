//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{Duration, FixedOffset};
use kayak_rental_core::domain::Tariff;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the administrator created when the user table is empty.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cors_origin: String,
    pub public_base_url: String,
    /// Local zone for day/week/month report boundaries.
    pub report_offset: FixedOffset,
    pub allow_signup: bool,
    pub tariff: Tariff,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Load Rental Settings ---
        let report_offset = parse_var("REPORT_UTC_OFFSET", "+00:00")?;
        let allow_signup = parse_var("ALLOW_SIGNUP", "false")?;

        let defaults = Tariff::default();
        let simple_price = parse_var("RENTAL_PRICE_SIMPLE", &defaults.simple_price.to_string())?;
        let double_price = parse_var("RENTAL_PRICE_DOUBLE", &defaults.double_price.to_string())?;
        check_price("RENTAL_PRICE_SIMPLE", simple_price)?;
        check_price("RENTAL_PRICE_DOUBLE", double_price)?;
        let duration_minutes: i64 = parse_var(
            "RENTAL_DURATION_MINUTES",
            &defaults.duration.num_minutes().to_string(),
        )?;
        if duration_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "RENTAL_DURATION_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }
        let tariff = Tariff {
            simple_price,
            double_price,
            duration: Duration::minutes(duration_minutes),
        };

        // --- Load Bootstrap Administrator (all or nothing) ---
        let bootstrap_admin = match (
            std::env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: std::env::var("BOOTSTRAP_ADMIN_NAME")
                    .unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password,
            }),
            (Some(_), None) => {
                return Err(ConfigError::MissingVar("BOOTSTRAP_ADMIN_PASSWORD".to_string()))
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingVar("BOOTSTRAP_ADMIN_EMAIL".to_string()))
            }
            (None, None) => None,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            public_base_url,
            report_offset,
            allow_signup,
            tariff,
            bootstrap_admin,
        })
    }
}

/// Prices must be positive and fit the stored `BIGINT` amount.
fn check_price(name: &str, price: u64) -> Result<(), ConfigError> {
    if price == 0 || i64::try_from(price).is_err() {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("{} is not a positive amount", price),
        ));
    }
    Ok(())
}

/// Reads `name`, falling back to `default`, and parses it.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "DATABASE_URL",
        "RUST_LOG",
        "CORS_ORIGIN",
        "PUBLIC_BASE_URL",
        "REPORT_UTC_OFFSET",
        "ALLOW_SIGNUP",
        "RENTAL_PRICE_SIMPLE",
        "RENTAL_PRICE_DOUBLE",
        "RENTAL_DURATION_MINUTES",
        "BOOTSTRAP_ADMIN_NAME",
        "BOOTSTRAP_ADMIN_EMAIL",
        "BOOTSTRAP_ADMIN_PASSWORD",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.report_offset.local_minus_utc(), 0);
        assert!(!config.allow_signup);
        assert_eq!(config.tariff, Tariff::default());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgres://localhost/kayaks");
        std::env::set_var("REPORT_UTC_OFFSET", "-03:00");
        std::env::set_var("ALLOW_SIGNUP", "true");
        std::env::set_var("RENTAL_PRICE_SIMPLE", "7000");
        std::env::set_var("RENTAL_DURATION_MINUTES", "45");
        std::env::set_var("PUBLIC_BASE_URL", "https://rentals.example.com/");
        std::env::set_var("BOOTSTRAP_ADMIN_EMAIL", "admin@kayak.com");
        std::env::set_var("BOOTSTRAP_ADMIN_PASSWORD", "s3cret");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/kayaks"));
        assert_eq!(config.report_offset.local_minus_utc(), -3 * 3600);
        assert!(config.allow_signup);
        assert_eq!(config.tariff.simple_price, 7000);
        assert_eq!(config.tariff.double_price, 8000);
        assert_eq!(config.tariff.duration, Duration::minutes(45));
        assert_eq!(config.public_base_url, "https://rentals.example.com");
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.name, "Administrator");
        assert_eq!(admin.email, "admin@kayak.com");
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_reported() {
        clear_env();
        std::env::set_var("RENTAL_PRICE_DOUBLE", "lots");
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "RENTAL_PRICE_DOUBLE"));

        std::env::set_var("RENTAL_DURATION_MINUTES", "0");
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "RENTAL_DURATION_MINUTES"));
    }

    #[test]
    #[serial]
    fn test_prices_must_be_positive() {
        clear_env();
        std::env::set_var("RENTAL_PRICE_SIMPLE", "0");
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "RENTAL_PRICE_SIMPLE"));

        std::env::set_var("RENTAL_PRICE_DOUBLE", u64::MAX.to_string());
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "RENTAL_PRICE_DOUBLE"));
    }

    #[test]
    #[serial]
    fn test_half_configured_bootstrap_admin_is_rejected() {
        clear_env();
        std::env::set_var("BOOTSTRAP_ADMIN_EMAIL", "admin@kayak.com");
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::MissingVar(ref var) if var == "BOOTSTRAP_ADMIN_PASSWORD"));
    }
}
