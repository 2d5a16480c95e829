use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;
use crate::external::yahoo;

const MAX_INTERVAL_HOURS: u64 = 24 * 365;
const MAX_CLEANUP_DAYS: u64 = 365;
const MAX_RETENTION_DAYS: i64 = 3650;
const MAX_MIN_REFRESH_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub yahoo_base_url: String,
    pub discovery: DiscoveryConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Pause between consecutive provider probes.
    pub probe_delay: Duration,
    /// Days of price history requested when validating a symbol.
    pub history_days: u32,
    /// Scheduled cycles are skipped while the last run is younger than this.
    pub min_refresh_interval: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub discovery_interval: Duration,
    pub cleanup_interval: Duration,
    pub retention_days: i64,
    /// A job that fails is skipped until this much time has passed.
    pub error_backoff: Duration,
    pub stop_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_delay: Duration::from_millis(500),
            history_days: 5,
            min_refresh_interval: chrono::Duration::hours(24),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            discovery_interval: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(7 * 24 * 60 * 60),
            retention_days: 7,
            error_backoff: Duration::from_secs(300),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; unset keys take defaults.
    /// Values outside their accepted range are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_refresh_hours = parse_in(&lookup, "MIN_REFRESH_HOURS", 24i64, 0..=MAX_MIN_REFRESH_HOURS)?;
        let discovery = DiscoveryConfig {
            probe_delay: Duration::from_millis(parse_in(&lookup, "PROBE_DELAY_MS", 500u64, 0..=60_000)?),
            history_days: parse_in(&lookup, "HISTORY_DAYS", 5u32, 1..=365)?,
            min_refresh_interval: chrono::Duration::try_hours(min_refresh_hours)
                .ok_or_else(|| AppError::Config(format!("MIN_REFRESH_HOURS = {} is too large", min_refresh_hours)))?,
        };

        let cleanup_days = parse_in(&lookup, "CLEANUP_INTERVAL_DAYS", 7u64, 1..=MAX_CLEANUP_DAYS)?;
        let scheduler = SchedulerConfig {
            enabled: parse_or(&lookup, "SCHEDULER_ENABLED", true)?,
            discovery_interval: hours(
                "DISCOVERY_INTERVAL_HOURS",
                parse_in(&lookup, "DISCOVERY_INTERVAL_HOURS", 24u64, 1..=MAX_INTERVAL_HOURS)?,
            )?,
            cleanup_interval: days("CLEANUP_INTERVAL_DAYS", cleanup_days)?,
            retention_days: parse_in(&lookup, "NOTIFICATION_RETENTION_DAYS", 7i64, 0..=MAX_RETENTION_DAYS)?,
            error_backoff: Duration::from_secs(parse_in(&lookup, "ERROR_BACKOFF_SECONDS", 300u64, 0..=86_400)?),
            stop_timeout: Duration::from_secs(parse_in(&lookup, "STOP_TIMEOUT_SECONDS", 5u64, 0..=300)?),
        };

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or_else(|| yahoo::DEFAULT_BASE_URL.to_string()),
            discovery,
            scheduler,
        })
    }

    /// Defaults rooted at `data_dir`.
    #[cfg(test)]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_dir: data_dir.into(),
            yahoo_base_url: yahoo::DEFAULT_BASE_URL.to_string(),
            discovery: DiscoveryConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.data_dir.join("notifications.json")
    }

    pub fn stock_cache_path(&self) -> PathBuf {
        self.data_dir.join("stock_cache.json")
    }

    pub fn last_update_path(&self) -> PathBuf {
        self.data_dir.join("last_update.json")
    }
}

fn hours(key: &str, h: u64) -> Result<Duration, AppError> {
    h.checked_mul(60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::Config(format!("{} is too large", key)))
}

fn days(key: &str, d: u64) -> Result<Duration, AppError> {
    let h = d
        .checked_mul(24)
        .ok_or_else(|| AppError::Config(format!("{} is too large", key)))?;
    hours(key, h)
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} = {:?}: {}", key, raw, e))),
        _ => Ok(default),
    }
}

fn parse_in<T, F>(lookup: &F, key: &str, default: T, range: RangeInclusive<T>) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if !range.contains(&value) {
        return Err(AppError::Config(format!(
            "{} = {} is outside {}..={}",
            key,
            value,
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}
