//! Configuration module for the running-crew backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Configuration could not be parsed from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human readable text
    pub log_json: bool,
    /// Name of the session cookie
    pub session_cookie: String,
    /// Minutes of inactivity before a session expires
    pub session_ttl_minutes: i64,
    /// Only send the session cookie over HTTPS
    pub secure_cookies: bool,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
    /// Largest radius accepted by the nearby search
    pub max_radius_km: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/runcrew.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            session_cookie: "runcrew_session".to_string(),
            session_ttl_minutes: 60 * 24 * 7,
            secure_cookies: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_radius_km: 50.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            db_path: env::var("RUNCREW_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind_addr: parse_var("RUNCREW_BIND_ADDR", defaults.bind_addr)?,
            log_level: env::var("RUNCREW_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_var("RUNCREW_LOG_JSON", defaults.log_json)?,
            session_cookie: env::var("RUNCREW_SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            session_ttl_minutes: parse_var(
                "RUNCREW_SESSION_TTL_MINUTES",
                defaults.session_ttl_minutes,
            )?,
            secure_cookies: parse_var("RUNCREW_SECURE_COOKIES", defaults.secure_cookies)?,
            bcrypt_cost: parse_var("RUNCREW_BCRYPT_COST", defaults.bcrypt_cost)?,
            max_radius_km: parse_var("RUNCREW_MAX_RADIUS_KM", defaults.max_radius_km)?,
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}
