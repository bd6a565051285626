//! Configuration management.
//!
//! Configuration is loaded from multiple sources with the following priority:
//!
//! 1. Environment variables (`DOCKMOCK_*`, `__` separates sections)
//! 2. User config file (`~/.config/dockmock/config.toml`)
//! 3. System config file (`/etc/dockmock/config.toml`)
//! 4. Default values
//!
//! ## Example Configuration File
//!
//! ```toml
//! [engine]
//! latency_ms = 200
//! stop_exit_code = 123
//! first_pid = 12801
//!
//! [events]
//! capacity = 256
//!
//! [fixtures]
//! seed = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! `DOCKMOCK_ENGINE__LATENCY_MS=0` makes every operation commit inline.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "DOCKMOCK_";

/// Simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lifecycle engine settings.
    pub engine: EngineConfig,
    /// Event bus settings.
    pub events: EventsConfig,
    /// Demo data settings.
    pub fixtures: FixturesConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from the system and user files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value has
    /// the wrong type.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(system_config_path()))
            .merge(Toml::file(user_config_path()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Loads configuration from a specific file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Lifecycle engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before deferred operations commit, in milliseconds.
    pub latency_ms: u64,
    /// Exit code recorded when a container is stopped.
    pub stop_exit_code: i32,
    /// First process id handed out to started containers.
    pub first_pid: u32,
}

impl EngineConfig {
    /// Returns the latency as a duration.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latency_ms: 200,
            stop_exit_code: 123,
            first_pid: 12801,
        }
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Backlog kept for slow broadcast receivers.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Demo data configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Seed the store with the demo containers and images.
    pub seed: bool,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("dockmock")
        .join("config.toml")
}

fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/dockmock/config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.latency(), Duration::from_millis(200));
        assert_eq!(config.engine.stop_exit_code, 123);
        assert_eq!(config.engine.first_pid, 12801);
        assert_eq!(config.events.capacity, 256);
        assert!(config.fixtures.seed);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[engine]\nlatency_ms = 5\nstop_exit_code = 0\n\n[fixtures]\nseed = false"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.engine.latency_ms, 5);
        assert_eq!(config.engine.stop_exit_code, 0);
        assert_eq!(config.engine.first_pid, 12801);
        assert!(!config.fixtures.seed);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_bad_value_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nlatency_ms = \"soon\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
