// ============================
// taskboard-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML (or JSON) file, then `TASKBOARD_`-prefixed environment variables.
//! Nested keys use a double underscore, e.g. `TASKBOARD_RATE_LIMIT__MAX_REQUESTS`.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::MAX_SESSION_TTL;

/// Config file read by [`Settings::load`] when present
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TASKBOARD_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path
    pub data_dir: PathBuf,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Password requirements
    pub password_requirements: PasswordRequirements,
    /// Request rate limiting
    pub rate_limit: RateLimitSettings,
    /// Real-time delivery
    pub realtime: RealtimeSettings,
    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

/// Password rules and hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// scrypt cost parameter (log2 of N)
    pub hash_cost: u8,
}

/// Fixed-window request limits, applied per client address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeSettings {
    /// Events buffered per connection before further events are dropped for it
    pub connection_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            password_requirements: PasswordRequirements::default(),
            rate_limit: RateLimitSettings::default(),
            realtime: RealtimeSettings::default(),
            cors_permissive: true,
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
            hash_cost: 15,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            connection_buffer: 64,
        }
    }
}

impl Settings {
    /// Load settings from `config/default.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(Path::new(DEFAULT_CONFIG_PATH)))
    }

    /// Load settings from an explicit config file and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(path.exists(), "config file {} not found", path.display());
        Self::extract(Self::figment(path))
    }

    fn figment(path: &Path) -> Figment {
        let figment = Figment::from(Serialized::defaults(Settings::default()));
        let figment = if path.extension().is_some_and(|ext| ext == "json") {
            figment.merge(Json::file(path))
        } else {
            figment.merge(Toml::file(path))
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        ensure!(self.session_ttl_secs > 0, "session TTL must be positive");
        ensure!(
            self.session_ttl_secs <= MAX_SESSION_TTL.as_secs(),
            "session TTL must not exceed {} seconds",
            MAX_SESSION_TTL.as_secs()
        );

        let pw = &self.password_requirements;
        ensure!(pw.min_length >= 1, "password min length must be at least 1");
        ensure!(
            pw.max_length >= pw.min_length,
            "password max length must not be below min length"
        );
        ensure!(
            (1..=20).contains(&pw.hash_cost),
            "password hash cost must be between 1 and 20"
        );

        ensure!(self.rate_limit.max_requests > 0, "rate limit must allow requests");
        ensure!(self.rate_limit.window_secs > 0, "rate limit window must be positive");
        ensure!(
            self.realtime.connection_buffer > 0,
            "connection buffer must be positive"
        );
        Ok(())
    }
}
