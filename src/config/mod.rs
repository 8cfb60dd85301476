//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `citadel` binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GcError, Result};
use crate::protocol::DEFAULT_APP_ID;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GC session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Orchestration timings for the binary
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GcError::Config(format!("Failed to read config file: {e}")))?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load from `path` when given (or the default config file when it exists),
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default config file location (`<config dir>/citadel/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("citadel").join("config.toml"))
    }

    /// Apply `CITADEL_*` and `LOG_LEVEL` environment variables
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(app_id) = env_parse("CITADEL_APP_ID") {
            self.session.app_id = app_id;
        }
        if let Some(ms) = env_parse("CITADEL_FIRST_HELLO_DELAY_MS") {
            self.session.first_hello_delay_ms = ms;
        }
        if let Some(ms) = env_parse("CITADEL_HELLO_BACKOFF_INITIAL_MS") {
            self.session.hello_backoff_initial_ms = ms;
        }
        if let Some(ms) = env_parse("CITADEL_HELLO_BACKOFF_MAX_MS") {
            self.session.hello_backoff_max_ms = ms;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        self
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;
        if session.hello_backoff_initial_ms == 0 {
            return Err(GcError::Config(
                "hello_backoff_initial_ms must be greater than zero".to_string(),
            ));
        }
        if session.hello_backoff_initial_ms > session.hello_backoff_max_ms {
            return Err(GcError::Config(format!(
                "hello_backoff_initial_ms ({}) exceeds hello_backoff_max_ms ({})",
                session.hello_backoff_initial_ms, session.hello_backoff_max_ms
            )));
        }
        if session.max_decompressed_bytes == 0 {
            return Err(GcError::Config(
                "max_decompressed_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// GC session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Application whose coordinator we talk to
    pub app_id: u32,

    /// Delay between launch (or a fresh sequence) and the first hello
    pub first_hello_delay_ms: u64,

    /// First retry delay after an unanswered hello
    pub hello_backoff_initial_ms: u64,

    /// Retry delay cap
    pub hello_backoff_max_ms: u64,

    /// Upper bound for a decompressed legacy payload
    pub max_decompressed_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID,
            first_hello_delay_ms: 500,
            hello_backoff_initial_ms: 1000,
            hello_backoff_max_ms: 60_000,
            max_decompressed_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl SessionConfig {
    /// Delay before the first hello of a sequence
    pub fn first_hello_delay(&self) -> Duration {
        Duration::from_millis(self.first_hello_delay_ms)
    }

    /// First retry delay
    pub fn hello_backoff_initial(&self) -> Duration {
        Duration::from_millis(self.hello_backoff_initial_ms)
    }

    /// Retry delay cap
    pub fn hello_backoff_max(&self) -> Duration {
        Duration::from_millis(self.hello_backoff_max_ms)
    }
}

/// Orchestration timings used by the `citadel` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Delay after the transport logs on before launching the application
    pub launch_delay_ms: u64,

    /// Delay after `connected` before requesting active matches
    pub request_matches_delay_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            launch_delay_ms: 1500,
            request_matches_delay_ms: 3000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.app_id, 1422450);
        assert_eq!(config.session.first_hello_delay_ms, 500);
        assert_eq!(config.session.hello_backoff_initial_ms, 1000);
        assert_eq!(config.session.hello_backoff_max_ms, 60_000);
        assert_eq!(config.runner.launch_delay_ms, 1500);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [session]
            app_id = 730
            hello_backoff_max_ms = 30000

            [runner]
            request_matches_delay_ms = 100

            [logging]
            json = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.session.app_id, 730);
        assert_eq!(config.session.hello_backoff_max_ms, 30_000);
        // Unspecified fields keep their defaults
        assert_eq!(config.session.hello_backoff_initial_ms, 1000);
        assert_eq!(config.runner.request_matches_delay_ms, 100);
        assert_eq!(config.runner.launch_delay_ms, 1500);
        assert!(config.logging.json);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nfirst_hello_delay_ms = 250").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.session.first_hello_delay_ms, 250);
        assert_eq!(config.session.first_hello_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = Config::from_file("/nonexistent/citadel.toml");
        assert!(matches!(result, Err(GcError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_backoff() {
        let mut config = Config::default();
        config.session.hello_backoff_initial_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.hello_backoff_initial_ms = 120_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.max_decompressed_bytes = 0;
        assert!(config.validate().is_err());
    }
}
