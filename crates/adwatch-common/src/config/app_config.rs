//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub fleet: FleetConfig,
    pub bridge: BridgeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default)]
    pub run_migrations: bool,
}

/// Redis (event bus) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// Userbot fleet supervision settings
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    pub health_check_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub inactivity_timeout_secs: u64,
    pub restart_delay_secs: u64,
    pub restart_max_delay_secs: u64,
    /// 0 means unlimited
    pub restart_max_attempts: u32,
    pub min_active_sessions: usize,
    pub sessions_dir: PathBuf,
}

impl FleetConfig {
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    #[must_use]
    pub fn restart_max_delay(&self) -> Duration {
        Duration::from_secs(self.restart_max_delay_secs)
    }

    /// Delay before restart attempt `attempt` (1-based): doubles from the base delay, capped
    #[must_use]
    pub fn restart_backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u64 << attempt.saturating_sub(1).min(16);
        let secs = self
            .restart_delay_secs
            .saturating_mul(factor)
            .min(self.restart_max_delay_secs.max(self.restart_delay_secs));
        Duration::from_secs(secs)
    }

    /// Whether another restart is allowed after `attempts` consecutive failures
    #[must_use]
    pub fn allows_restart(&self, attempts: u32) -> bool {
        self.restart_max_attempts == 0 || attempts <= self.restart_max_attempts
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: 30,
            heartbeat_interval_secs: 600,
            inactivity_timeout_secs: 3000,
            restart_delay_secs: 300,
            restart_max_delay_secs: 3600,
            restart_max_attempts: 0,
            min_active_sessions: 1,
            sessions_dir: PathBuf::from("userbot/sessions"),
        }
    }
}

/// Request/response bridge settings
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub response_timeout_secs: u64,
}

impl BridgeConfig {
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            response_timeout_secs: 60,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "adwatch".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("crates/adwatch-db/migrations")
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// Read `name` and parse it, or fall back to `default` when unset
fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default),
    }
}

/// Redis URL from `REDIS_URL`, or assembled from the `BOT_REDIS_*` variables
fn redis_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("REDIS_URL") {
        return Ok(url);
    }
    let host = lookup("BOT_REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = parse_or(lookup, "BOT_REDIS_PORT", 6379)?;
    let db: u32 = parse_or(lookup, "BOT_REDIS_DB", 0)?;
    Ok(format!("redis://{host}:{port}/{db}"))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fleet_defaults = FleetConfig::default();
        let bridge_defaults = BridgeConfig::default();

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    default_max_connections(),
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    default_min_connections(),
                )?,
                migrations_dir: lookup("DATABASE_MIGRATIONS_DIR")
                    .map_or_else(default_migrations_dir, PathBuf::from),
                run_migrations: parse_or(&lookup, "DATABASE_RUN_MIGRATIONS", false)?,
            },
            redis: RedisConfig {
                url: redis_url(&lookup)?,
                max_connections: parse_or(
                    &lookup,
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections(),
                )?,
                reconnect_delay_ms: parse_or(
                    &lookup,
                    "REDIS_RECONNECT_DELAY_MS",
                    default_reconnect_delay_ms(),
                )?,
            },
            fleet: FleetConfig {
                health_check_interval_secs: parse_or(
                    &lookup,
                    "FLEET_HEALTH_CHECK_INTERVAL_SECS",
                    fleet_defaults.health_check_interval_secs,
                )?,
                heartbeat_interval_secs: parse_or(
                    &lookup,
                    "FLEET_HEARTBEAT_INTERVAL_SECS",
                    fleet_defaults.heartbeat_interval_secs,
                )?,
                inactivity_timeout_secs: parse_or(
                    &lookup,
                    "FLEET_INACTIVITY_TIMEOUT_SECS",
                    fleet_defaults.inactivity_timeout_secs,
                )?,
                restart_delay_secs: parse_or(
                    &lookup,
                    "FLEET_RESTART_DELAY_SECS",
                    fleet_defaults.restart_delay_secs,
                )?,
                restart_max_delay_secs: parse_or(
                    &lookup,
                    "FLEET_RESTART_MAX_DELAY_SECS",
                    fleet_defaults.restart_max_delay_secs,
                )?,
                restart_max_attempts: parse_or(
                    &lookup,
                    "FLEET_RESTART_MAX_ATTEMPTS",
                    fleet_defaults.restart_max_attempts,
                )?,
                min_active_sessions: parse_or(
                    &lookup,
                    "FLEET_MIN_ACTIVE_SESSIONS",
                    fleet_defaults.min_active_sessions,
                )?,
                sessions_dir: lookup("FLEET_SESSIONS_DIR")
                    .map_or(fleet_defaults.sessions_dir, PathBuf::from),
            },
            bridge: BridgeConfig {
                response_timeout_secs: parse_or(
                    &lookup,
                    "BRIDGE_RESPONSE_TIMEOUT_SECS",
                    bridge_defaults.response_timeout_secs,
                )?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
