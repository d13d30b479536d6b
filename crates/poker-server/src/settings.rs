//! Layered server settings.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `POKER_*` environment overrides
//!
//! CLI flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use poker_telemetry::{parse_level, TelemetryConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::server::ServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{key} must be within {min}..={max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

const SEND_QUEUE_RANGE: (usize, usize) = (1, 65_536);
const SEND_TIMEOUT_MS_RANGE: (u64, u64) = (1, 600_000);
const HEARTBEAT_SECS_RANGE: (u64, u64) = (1, 3_600);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub max_send_queue: usize,
    pub send_timeout_ms: u64,
    pub heartbeat_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            db_path: poker_home()
                .join("database")
                .join("poker.db")
                .to_string_lossy()
                .into_owned(),
            max_send_queue: defaults.max_send_queue,
            send_timeout_ms: defaults.send_timeout.as_millis() as u64,
            heartbeat_secs: defaults.heartbeat_interval.as_secs(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: true,
        }
    }
}

impl Settings {
    /// Reject values the server cannot run with, e.g. a zero heartbeat period.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range(
            "server.maxSendQueue",
            self.server.max_send_queue as u64,
            (SEND_QUEUE_RANGE.0 as u64, SEND_QUEUE_RANGE.1 as u64),
        )?;
        check_range("server.sendTimeoutMs", self.server.send_timeout_ms, SEND_TIMEOUT_MS_RANGE)?;
        check_range("server.heartbeatSecs", self.server.heartbeat_secs, HEARTBEAT_SECS_RANGE)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            max_send_queue: self.server.max_send_queue,
            send_timeout: Duration::from_millis(self.server.send_timeout_ms),
            heartbeat_interval: Duration::from_secs(self.server.heartbeat_secs),
        }
    }

    /// Unknown level names fall back to the telemetry default.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();
        TelemetryConfig {
            log_level: parse_level(&self.logging.level).unwrap_or(defaults.log_level),
            json: self.logging.json,
            ..defaults
        }
    }
}

fn check_range(key: &'static str, value: u64, (min, max): (u64, u64)) -> Result<(), SettingsError> {
    if value < min || value > max {
        return Err(SettingsError::OutOfRange { key, value, min, max });
    }
    Ok(())
}

fn poker_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".poker")
}

/// `~/.poker/settings.json`
pub fn settings_path() -> PathBuf {
    poker_home().join("settings.json")
}

/// Load from `path` (defaults if missing), apply process env overrides, validate.
pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides_from(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

/// Objects merge per key, nulls in `source` are skipped, anything else replaces.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `POKER_*` overrides read through `lookup`. Invalid values are ignored.
pub fn apply_env_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = read("POKER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("POKER_PORT").and_then(|v| parse_in_range("POKER_PORT", &v, (1, u16::MAX))) {
        settings.server.port = v;
    }
    if let Some(v) = read("POKER_DB_PATH") {
        settings.server.db_path = v;
    }
    if let Some(v) = read("POKER_SEND_QUEUE").and_then(|v| parse_in_range("POKER_SEND_QUEUE", &v, SEND_QUEUE_RANGE)) {
        settings.server.max_send_queue = v;
    }
    if let Some(v) = read("POKER_SEND_TIMEOUT_MS").and_then(|v| parse_in_range("POKER_SEND_TIMEOUT_MS", &v, SEND_TIMEOUT_MS_RANGE)) {
        settings.server.send_timeout_ms = v;
    }
    if let Some(v) = read("POKER_HEARTBEAT_SECS").and_then(|v| parse_in_range("POKER_HEARTBEAT_SECS", &v, HEARTBEAT_SECS_RANGE)) {
        settings.server.heartbeat_secs = v;
    }
    if let Some(v) = read("POKER_LOG_LEVEL") {
        if parse_level(&v).is_some() {
            settings.logging.level = v;
        } else {
            warn!(key = "POKER_LOG_LEVEL", value = %v, "invalid log level env var, ignoring");
        }
    }
    if let Some(v) = read("POKER_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn!(key = "POKER_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

fn parse_in_range<T>(key: &str, raw: &str, (min, max): (T, T)) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let parsed = raw.trim().parse::<T>().ok().filter(|n| *n >= min && *n <= max);
    if parsed.is_none() {
        warn!(key, value = %raw, "invalid numeric env var, ignoring");
    }
    parsed
}

/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
