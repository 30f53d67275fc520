//! # API Configuration Module
//!
//! This module handles loading and managing configuration for the slot booking
//! server. Values come from environment variables (a `.env` file is honored by
//! the binaries through `dotenv`) with defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is used when unset
//! - `SEED_FILE`: JSON file of schools and templates loaded into the in-memory store
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Whole-request timeout (default: 30)
//! - `DEFAULT_DAY_START` / `DEFAULT_DAY_END`: Default working hours (default: 08:00-16:00)
//! - `DEFAULT_SLOT_MINUTES`: Default slot duration (default: 60)
//! - `BOOKING_MAX_RETRIES`: Retries after a transient booking failure (default: 3)
//! - `BOOKING_ATTEMPT_TIMEOUT_MS`: Per-attempt booking timeout (default: 5000)
//! - `BOOKING_BACKOFF_BASE_MS`: First retry delay, doubled per retry (default: 50)
//! - `BOOKING_REJECT_PAST_DATES`: Refuse bookings before today, UTC (default: true)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use chrono::NaiveTime;
use eyre::{Result, WrapErr, eyre};
use slotbook_core::{
    allocator::{AllocatorPolicy, RetryPolicy},
    models::{template::WorkingHoursTemplate, time_format},
};
use tracing::Level;

/// Configuration for the slot booking server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}", config.server_addr());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL connection string; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Seed data for the in-memory store
    pub seed_file: Option<PathBuf>,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub default_day_start: NaiveTime,
    pub default_day_end: NaiveTime,
    pub default_slot_minutes: u32,

    pub booking_max_retries: u32,
    pub booking_attempt_timeout_ms: u64,
    pub booking_backoff_base_ms: u64,
    pub reject_past_dates: bool,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if a variable is set but cannot be
    /// parsed (ports, numbers, `HH:MM` times, booleans), or if the default
    /// working-hours template it describes is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 3000)?;

        // Storage settings
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let seed_file = lookup("SEED_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        // Logging settings
        let log_level = match lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = parse_or(&lookup, "API_REQUEST_TIMEOUT_SECONDS", 30)?;

        // Calendar defaults
        let default_day_start = time_or(&lookup, "DEFAULT_DAY_START", "08:00")?;
        let default_day_end = time_or(&lookup, "DEFAULT_DAY_END", "16:00")?;
        let default_slot_minutes = parse_or(&lookup, "DEFAULT_SLOT_MINUTES", 60)?;

        // Booking policy
        let booking_max_retries = parse_or(&lookup, "BOOKING_MAX_RETRIES", 3)?;
        let booking_attempt_timeout_ms = parse_or(&lookup, "BOOKING_ATTEMPT_TIMEOUT_MS", 5000)?;
        let booking_backoff_base_ms = parse_or(&lookup, "BOOKING_BACKOFF_BASE_MS", 50)?;
        let reject_past_dates = match lookup("BOOKING_REJECT_PAST_DATES") {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| eyre!("Invalid BOOKING_REJECT_PAST_DATES value: {}", raw))?,
        };

        let config = Self {
            host,
            port,
            database_url,
            seed_file,
            log_level,
            cors_origins,
            request_timeout,
            default_day_start,
            default_day_end,
            default_slot_minutes,
            booking_max_retries,
            booking_attempt_timeout_ms,
            booking_backoff_base_ms,
            reject_past_dates,
        };

        config
            .default_template()
            .validate()
            .wrap_err("Invalid default working hours")?;

        Ok(config)
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Template used for schools without one of their own.
    pub fn default_template(&self) -> WorkingHoursTemplate {
        WorkingHoursTemplate::new(
            self.default_day_start,
            self.default_day_end,
            self.default_slot_minutes,
        )
    }

    pub fn allocator_policy(&self) -> AllocatorPolicy {
        AllocatorPolicy {
            retry: RetryPolicy {
                max_retries: self.booking_max_retries,
                base_backoff: Duration::from_millis(self.booking_backoff_base_ms),
                attempt_timeout: Duration::from_millis(self.booking_attempt_timeout_ms),
                ..RetryPolicy::default()
            },
            reject_past_dates: self.reject_past_dates,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {} value: {}", key, raw)),
        None => Ok(default),
    }
}

fn time_or<F>(lookup: &F, key: &str, default: &str) -> Result<NaiveTime>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    time_format::parse(&raw).ok_or_else(|| eyre!("Invalid {} value (expected HH:MM): {}", key, raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
