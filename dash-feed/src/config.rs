//! Configuration for the dashboard feed
//!
//! Loads configuration from a TOML file. Every section has defaults matching
//! the reference sender (`127.0.0.1:8888`, 500ms tick), so the daemon runs
//! without any file at all.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address the dashboard connects to
    ///
    /// Examples:
    /// - `127.0.0.1:8888` - Localhost only (dashboard on the same machine)
    /// - `0.0.0.0:8888` - All interfaces
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Sleep between non-blocking accept attempts (milliseconds)
    #[serde(default = "default_accept_poll_ms")]
    pub accept_poll_ms: u64,

    /// Per-client write timeout (milliseconds). A peer that stalls longer is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1:8888".to_string()
}
fn default_accept_poll_ms() -> u64 {
    10
}
fn default_write_timeout_ms() -> u64 {
    1000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            accept_poll_ms: default_accept_poll_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms.max(1))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms.max(1))
    }
}

/// Which generator produces telemetry snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Independent uniform draws every tick
    #[default]
    Random,
    /// Repeating accelerate/brake drive cycle
    Ramp,
}

/// Broadcast loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BroadcastConfig {
    /// Period between telemetry ticks (milliseconds)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Telemetry generator
    #[serde(default)]
    pub source: SourceKind,

    /// Append `temperature` and `totalDistance` to every telemetry message
    #[serde(default)]
    pub extended_fields: bool,

    /// RNG seed (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,
}

fn default_tick_ms() -> u64 {
    500
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            source: SourceKind::default(),
            extended_fields: false,
            random_seed: 0,
        }
    }
}

impl BroadcastConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// Missing sections and keys fall back to their defaults.
    ///
    /// # Example
    /// ```no_run
    /// use dash_feed::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("dash-feed.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
