use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Settings every binary needs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_dir: PathBuf,
    /// Hours east of UTC used to decide calendar days (WIB = +7)
    pub utc_offset_hours: i32,
    pub timezone_label: String,
}

#[derive(Clone)]
pub struct ApiConfig {
    pub common: Config,
    pub server_host: String,
    pub server_port: u16,
    pub api_token: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub common: Config,
    pub server_host: String,
    pub server_port: u16,
    pub webhook_token: Option<String>,
    pub reports_dir: PathBuf,
    pub chart_service_url: String,
    pub chart_timeout_secs: u64,
    pub dashboard_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub common: Config,
    pub backup_dir: PathBuf,
    pub dump_program: String,
    pub daily_hour: u32,
    pub daily_minute: u32,
}

// Keep the shared secret out of startup logs
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("common", &self.common)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Source of raw configuration values, normally the process environment
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct EnvLookup;

impl Lookup for EnvLookup {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl Lookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

fn required(lookup: &impl Lookup, key: &'static str) -> Result<String, ConfigError> {
    lookup.get(key).ok_or(ConfigError::Missing(key))
}

fn or_default(lookup: &impl Lookup, key: &str, default: &str) -> String {
    lookup.get(key).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(lookup: &impl Lookup, key: &str, default: T) -> T {
    lookup
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&EnvLookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let utc_offset_hours = match lookup.get("REPORT_UTC_OFFSET_HOURS") {
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|h| (-23..=23).contains(h))
                .ok_or(ConfigError::Invalid {
                    key: "REPORT_UTC_OFFSET_HOURS",
                    value: raw,
                })?,
            None => 7,
        };

        Ok(Config {
            database_url: required(lookup, "DATABASE_URL")?,
            log_dir: PathBuf::from(or_default(lookup, "LOG_DIR", "logs")),
            utc_offset_hours,
            timezone_label: or_default(lookup, "REPORT_TIMEZONE_LABEL", "WIB"),
        })
    }

    pub fn utc_offset(&self) -> FixedOffset {
        // Range checked in from_lookup
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&EnvLookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(ApiConfig {
            common: Config::from_lookup(lookup)?,
            server_host: or_default(lookup, "SERVER_HOST", "0.0.0.0"),
            server_port: parsed_or(lookup, "SERVER_PORT", 3000),
            api_token: required(lookup, "API_TOKEN")?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&EnvLookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(BotConfig {
            common: Config::from_lookup(lookup)?,
            server_host: or_default(lookup, "BOT_HOST", "127.0.0.1"),
            server_port: parsed_or(lookup, "BOT_PORT", 3001),
            webhook_token: lookup.get("BOT_WEBHOOK_TOKEN"),
            reports_dir: PathBuf::from(or_default(lookup, "REPORTS_DIR", "reports")),
            chart_service_url: or_default(
                lookup,
                "CHART_SERVICE_URL",
                "https://quickchart.io/chart",
            ),
            chart_timeout_secs: parsed_or(lookup, "CHART_TIMEOUT_SECS", 20),
            dashboard_url: lookup.get("DASHBOARD_URL"),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn chart_timeout(&self) -> Duration {
        Duration::from_secs(self.chart_timeout_secs)
    }
}

impl BackupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&EnvLookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let daily_hour = parsed_or(lookup, "BACKUP_HOUR", 23u32);
        let daily_minute = parsed_or(lookup, "BACKUP_MINUTE", 0u32);
        if daily_hour > 23 {
            return Err(ConfigError::Invalid {
                key: "BACKUP_HOUR",
                value: daily_hour.to_string(),
            });
        }
        if daily_minute > 59 {
            return Err(ConfigError::Invalid {
                key: "BACKUP_MINUTE",
                value: daily_minute.to_string(),
            });
        }

        Ok(BackupConfig {
            common: Config::from_lookup(lookup)?,
            backup_dir: PathBuf::from(or_default(lookup, "BACKUP_DIR", "backups")),
            dump_program: or_default(lookup, "BACKUP_DUMP_PROGRAM", "pg_dump"),
            daily_hour,
            daily_minute,
        })
    }

    /// Local wall-clock time of the daily run
    pub fn daily_at(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.daily_hour, self.daily_minute, 0).unwrap_or(NaiveTime::MIN)
    }
}
