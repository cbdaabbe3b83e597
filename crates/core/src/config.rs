use std::env;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled numeric key. A value that does not parse is logged and
/// replaced by `default`.
fn profiled_env_parsed<T>(profile: &str, key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match profiled_env_opt(profile, key) {
        Some(raw) => parse_or_default(key, &raw, default),
        None => default,
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = raw, %default, "unparseable config value, using default");
        default
    })
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub detector: DetectorConfig,
    pub telemetry: TelemetryConfig,
    pub postgres: PostgresConfig,
    pub alert: AlertConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VIGIL_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VIGIL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            detector: DetectorConfig::from_env_profiled(p),
            telemetry: TelemetryConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            alert: AlertConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    /// Reject settings that would make a detection cycle meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.detector.threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid {
                key: "DETECT_THRESHOLD",
                reason: format!("{threshold} is not a finite, non-negative number"),
            });
        }
        if self.telemetry.window_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "TELEMETRY_WINDOW_MINUTES",
                reason: "window must be at least one minute".to_string(),
            });
        }
        SourceKind::parse(&self.telemetry.source)?;
        match SinkKind::parse(&self.alert.sink)? {
            SinkKind::Webhook if self.alert.webhook_url.is_none() => {
                Err(ConfigError::Missing("ALERT_WEBHOOK_URL"))
            }
            _ => Ok(()),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  detector:    threshold={}", self.detector.threshold);
        tracing::info!(
            "  telemetry:   source={}, window={}m, table={}",
            self.telemetry.source,
            self.telemetry.window_minutes,
            self.telemetry.table
        );
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!("  alert:       sink={}, topic={}", self.alert.sink, self.alert.topic);
    }
}

// ── Detector ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// |z| a reading must exceed to be flagged.
    pub threshold: f64,
}

impl DetectorConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            threshold: profiled_env_parsed(p, "DETECT_THRESHOLD", 3.0),
        }
    }
}

// ── Telemetry source ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Postgres,
    Fixture,
}

impl SourceKind {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(SourceKind::Postgres),
            "fixture" => Ok(SourceKind::Fixture),
            other => Err(ConfigError::Invalid {
                key: "TELEMETRY_SOURCE",
                reason: format!("unknown source '{other}' (expected postgres or fixture)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// "postgres" or "fixture"
    pub source: String,
    pub window_minutes: u32,
    pub table: String,
}

impl TelemetryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            source: profiled_env_or(p, "TELEMETRY_SOURCE", "postgres"),
            window_minutes: profiled_env_parsed(p, "TELEMETRY_WINDOW_MINUTES", 60),
            table: profiled_env_or(p, "TELEMETRY_TABLE", "telemetry"),
        }
    }

    pub fn source_kind(&self) -> Result<SourceKind, ConfigError> {
        SourceKind::parse(&self.source)
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; overrides the individual fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
    pub query_timeout_secs: u64,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "DATABASE_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parsed(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "historian"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parsed(p, "PG_MAX_CONNECTIONS", 4),
            query_timeout_secs: profiled_env_parsed(p, "PG_QUERY_TIMEOUT_SECS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── Alerting ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Log,
    Zmq,
    Webhook,
}

impl SinkKind {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "log" => Ok(SinkKind::Log),
            "zmq" | "zeromq" => Ok(SinkKind::Zmq),
            "webhook" => Ok(SinkKind::Webhook),
            other => Err(ConfigError::Invalid {
                key: "ALERT_SINK",
                reason: format!("unknown sink '{other}' (expected log, zmq or webhook)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// "log", "zmq", "webhook"
    pub sink: String,
    pub topic: String,
    pub zmq_host: String,
    pub zmq_port: u16,
    /// Bind the PUB socket instead of connecting to a broker frontend.
    pub zmq_bind: bool,
    /// Local socket name; when set, host and port are ignored.
    pub zmq_ipc: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
}

impl AlertConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            sink: profiled_env_or(p, "ALERT_SINK", "log"),
            topic: profiled_env_or(p, "ALERT_TOPIC", "alarms/process_control"),
            zmq_host: profiled_env_or(p, "ALERT_ZMQ_HOST", "127.0.0.1"),
            zmq_port: profiled_env_parsed(p, "ALERT_ZMQ_PORT", 5560),
            zmq_bind: profiled_env_or(p, "ALERT_ZMQ_BIND", "false") == "true",
            zmq_ipc: profiled_env_opt(p, "ALERT_ZMQ_IPC"),
            webhook_url: profiled_env_opt(p, "ALERT_WEBHOOK_URL"),
            webhook_timeout_secs: profiled_env_parsed(p, "ALERT_WEBHOOK_TIMEOUT_SECS", 10),
        }
    }

    pub fn sink_kind(&self) -> Result<SinkKind, ConfigError> {
        SinkKind::parse(&self.sink)
    }
}
