use crate::db::DEFAULT_BATCH_SIZE;
use crate::errors::ConfigError;
use crate::scraper::{DelayRange, RetryPolicy};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings, read from the environment with a default for every key.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub base_url: String,

    pub price_start: u64,
    pub price_ceiling: u64,
    pub price_step: u64,
    pub max_windows: usize,
    pub max_pages: u32,

    pub workers: usize,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub timeout: Duration,

    pub dashboard_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "immo.sqlite3".to_string(),
            base_url: "https://www.zimmo.be".to_string(),
            price_start: 0,
            price_ceiling: 1_400_000,
            price_step: 50_000,
            max_windows: 50,
            max_pages: 100,
            workers: 2,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
            dashboard_dir: PathBuf::from("data/analysis"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` when present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let defaults = Config::default();

        let retry = RetryPolicy {
            max_attempts: env_or("IMMO_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            throttle: range_or("IMMO_THROTTLE_MS", defaults.retry.throttle)?,
            forbidden_backoff: range_or("IMMO_FORBIDDEN_BACKOFF_MS", defaults.retry.forbidden_backoff)?,
            error_backoff: range_or("IMMO_ERROR_BACKOFF_MS", defaults.retry.error_backoff)?,
        };

        let config = Self {
            db_path: env::var("IMMO_DB_PATH").unwrap_or(defaults.db_path),
            base_url: env::var("IMMO_BASE_URL").unwrap_or(defaults.base_url),
            price_start: env_or("IMMO_PRICE_START", defaults.price_start)?,
            price_ceiling: env_or("IMMO_PRICE_CEILING", defaults.price_ceiling)?,
            price_step: env_or("IMMO_PRICE_STEP", defaults.price_step)?,
            max_windows: env_or("IMMO_MAX_WINDOWS", defaults.max_windows)?,
            max_pages: env_or("IMMO_MAX_PAGES", defaults.max_pages)?,
            workers: env_or("IMMO_WORKERS", defaults.workers)?,
            batch_size: env_or("IMMO_BATCH_SIZE", defaults.batch_size)?,
            retry,
            timeout: Duration::from_secs(env_or("IMMO_TIMEOUT_SECS", defaults.timeout.as_secs())?),
            dashboard_dir: env::var("IMMO_DASHBOARD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dashboard_dir),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_step == 0 {
            return Err(ConfigError::Zero("IMMO_PRICE_STEP"));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero("IMMO_WORKERS"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("IMMO_BATCH_SIZE"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Zero("IMMO_MAX_ATTEMPTS"));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Zero("IMMO_MAX_PAGES"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Zero("IMMO_TIMEOUT_SECS"));
        }
        if self.price_ceiling < self.price_start {
            return Err(ConfigError::InvertedRange {
                start: self.price_start,
                ceiling: self.price_ceiling,
            });
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn range_or(key: &'static str, default: DelayRange) -> Result<DelayRange, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_range(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

/// Accepts `"2000-5000"` or a single fixed value like `"2000"`.
fn parse_range(key: &'static str, value: &str) -> Result<DelayRange, ConfigError> {
    let (min, max) = match value.split_once('-') {
        Some((lo, hi)) => (parse_value(key, lo)?, parse_value(key, hi)?),
        None => {
            let fixed = parse_value(key, value)?;
            (fixed, fixed)
        }
    };
    if min > max {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(DelayRange::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_step_is_rejected() {
        let config = Config {
            price_step: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Zero("IMMO_PRICE_STEP"))));
    }

    #[test]
    fn ranges_parse_both_forms() {
        let r = parse_range("K", "2000-5000").unwrap();
        assert_eq!((r.min_ms, r.max_ms), (2000, 5000));

        let fixed = parse_range("K", "250").unwrap();
        assert_eq!((fixed.min_ms, fixed.max_ms), (250, 250));

        assert!(parse_range("K", "9-1").is_err());
        assert!(parse_range("K", "abc").is_err());
    }
}
