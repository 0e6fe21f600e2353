//! Configuration module for the LearnHub backend.
//!
//! All configuration is loaded from `LEARNHUB_*` environment variables with sensible defaults.
//! External providers are optional: a missing credential group leaves that provider unconfigured.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Media host (Cloudinary) credentials.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Payment processor (Stripe) keys.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub publishable_key: String,
}

/// Outgoing SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Redis connection URL; the in-process cache is used when absent
    pub redis_url: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human format
    pub log_json: bool,
    /// HS256 secret shared with the access-token issuer
    pub access_token_secret: String,
    /// Exact CORS origin; any origin when absent
    pub cors_origin: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub stripe: Option<StripeConfig>,
    pub vdocipher_api_secret: Option<String>,
    pub smtp: Option<SmtpConfig>,
    /// How often the email outbox is drained
    pub outbox_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr = parse_var("LEARNHUB_BIND_ADDR", "127.0.0.1:8000")?;

        let db_path = env::var("LEARNHUB_DB_PATH")
            .unwrap_or_else(|_| "./data/learnhub.sqlite".to_string())
            .into();

        let redis_url = optional("LEARNHUB_REDIS_URL");

        let log_level = env::var("LEARNHUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = parse_var("LEARNHUB_LOG_JSON", "false")?;

        let access_token_secret = optional("LEARNHUB_ACCESS_TOKEN_SECRET")
            .ok_or(ConfigError::Missing("LEARNHUB_ACCESS_TOKEN_SECRET"))?;

        let cors_origin = optional("LEARNHUB_CORS_ORIGIN");

        let cloudinary = match (
            optional("LEARNHUB_CLOUDINARY_CLOUD_NAME"),
            optional("LEARNHUB_CLOUDINARY_API_KEY"),
            optional("LEARNHUB_CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let stripe = match (
            optional("LEARNHUB_STRIPE_SECRET_KEY"),
            optional("LEARNHUB_STRIPE_PUBLISHABLE_KEY"),
        ) {
            (Some(secret_key), Some(publishable_key)) => Some(StripeConfig {
                secret_key,
                publishable_key,
            }),
            _ => None,
        };

        let vdocipher_api_secret = optional("LEARNHUB_VDOCIPHER_API_SECRET");

        let smtp = match (optional("LEARNHUB_SMTP_HOST"), optional("LEARNHUB_SMTP_FROM")) {
            (Some(host), Some(from_address)) => Some(SmtpConfig {
                host,
                port: parse_var("LEARNHUB_SMTP_PORT", "587")?,
                from_address,
            }),
            _ => None,
        };

        let outbox_interval =
            Duration::from_secs(parse_var("LEARNHUB_OUTBOX_INTERVAL_SECS", "10")?);

        Ok(Self {
            bind_addr,
            db_path,
            redis_url,
            log_level,
            log_json,
            access_token_secret,
            cors_origin,
            cloudinary,
            stripe,
            vdocipher_api_secret,
            smtp,
            outbox_interval,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "LEARNHUB_BIND_ADDR",
        "LEARNHUB_DB_PATH",
        "LEARNHUB_REDIS_URL",
        "LEARNHUB_LOG_LEVEL",
        "LEARNHUB_LOG_JSON",
        "LEARNHUB_CORS_ORIGIN",
        "LEARNHUB_CLOUDINARY_CLOUD_NAME",
        "LEARNHUB_CLOUDINARY_API_KEY",
        "LEARNHUB_CLOUDINARY_API_SECRET",
        "LEARNHUB_STRIPE_SECRET_KEY",
        "LEARNHUB_STRIPE_PUBLISHABLE_KEY",
        "LEARNHUB_VDOCIPHER_API_SECRET",
        "LEARNHUB_SMTP_HOST",
        "LEARNHUB_SMTP_PORT",
        "LEARNHUB_SMTP_FROM",
        "LEARNHUB_OUTBOX_INTERVAL_SECS",
    ];

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for var in VARS {
            env::remove_var(var);
        }
        env::set_var("LEARNHUB_ACCESS_TOKEN_SECRET", "test-secret");

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.db_path, PathBuf::from("./data/learnhub.sqlite"));
        assert!(config.redis_url.is_none());
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.access_token_secret, "test-secret");
        assert!(config.cloudinary.is_none());
        assert!(config.stripe.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.outbox_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        let err = parse_var::<u16>("LEARNHUB_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "LEARNHUB_TEST_UNSET_PORT",
                ..
            }
        ));
    }
}
