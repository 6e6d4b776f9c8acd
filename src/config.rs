use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_token: String,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub payment_api_url: String,
    pub payment_access_token: String,
    pub payment_timeout: Duration,
    pub db_ready_timeout: Duration,
    /// How often tracking streams re-derive an order's status.
    pub tracking_refresh: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&get, "PORT", 8080)?,
            admin_token: required("ADMIN_TOKEN")?,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            upload_max_bytes: parsed(&get, "UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            payment_api_url: get("PAYMENT_API_URL")
                .unwrap_or_else(|| "https://api.mercadopago.com".to_string()),
            payment_access_token: required("PAYMENT_ACCESS_TOKEN")?,
            payment_timeout: Duration::from_secs(parsed(&get, "PAYMENT_TIMEOUT_SECS", 15)?),
            db_ready_timeout: Duration::from_secs(parsed(&get, "DB_READY_TIMEOUT_SECS", 30)?),
            tracking_refresh: Duration::from_secs(parsed(&get, "TRACKING_REFRESH_SECS", 60)?),
        })
    }
}

fn parsed<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
