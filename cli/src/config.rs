//! Configuration for the command-line tools
//!
//! Supports loading configuration from a TOML file passed with `--config`.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use vsphere::{ConnectionConfig, TaskWaitConfig};

/// Tool configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SDK endpoint settings
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Task wait settings
    #[serde(default)]
    pub tasks: TaskSettings,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level filter (default: "warn")
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionSettings {
    /// Verify the server certificate (default: false)
    #[serde(default)]
    pub verify_tls: bool,

    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// vim25 version sent in SOAPAction (default: "6.7")
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// Task wait configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TaskSettings {
    /// Server-side long-poll duration in seconds (default: 30)
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_timeout_secs() -> u64 {
    vsphere::vim::DEFAULT_TIMEOUT.as_secs()
}

fn default_api_version() -> String {
    vsphere::vim::DEFAULT_API_VERSION.to_string()
}

fn default_max_wait_secs() -> u64 {
    vsphere::vim::DEFAULT_MAX_WAIT.as_secs()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout_secs: default_timeout_secs(),
            api_version: default_api_version(),
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that only make sense together
    ///
    /// Each long-poll round must end on the server before the HTTP request
    /// times out, and a zero-second round would re-poll without pause.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_wait = self.tasks.max_wait_secs;
        let timeout = self.connection.timeout_secs;
        if max_wait == 0 {
            return Err(ConfigError::InvalidValue(
                "tasks.max_wait_secs".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if max_wait >= timeout {
            return Err(ConfigError::InvalidValue(
                "tasks.max_wait_secs".to_string(),
                format!(
                    "{} must be less than connection.timeout_secs ({})",
                    max_wait, timeout
                ),
            ));
        }
        Ok(())
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Endpoint settings for `host:port`
    pub fn connection_config(&self, host: &str, port: u16) -> ConnectionConfig {
        ConnectionConfig::new(host)
            .with_port(port)
            .with_api_version(self.connection.api_version.clone())
            .with_timeout(Duration::from_secs(self.connection.timeout_secs))
            .with_verify_tls(self.connection.verify_tls)
    }

    /// How snapshot tasks are waited on
    pub fn wait_config(&self) -> TaskWaitConfig {
        TaskWaitConfig::default().with_max_wait(Duration::from_secs(self.tasks.max_wait_secs))
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String, String),
    ParseError(String, String),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path, err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path, err)
            }
            ConfigError::InvalidValue(key, err) => {
                write!(f, "Invalid config value '{}': {}", key, err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "warn");
        assert!(!config.connection.verify_tls);
        assert_eq!(config.connection.timeout_secs, 60);
        assert_eq!(config.connection.api_version, "6.7");
        assert_eq!(config.tasks.max_wait_secs, 30);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [connection]
            verify_tls = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.connection.verify_tls);
        assert_eq!(config.connection.timeout_secs, 60); // default
        assert_eq!(config.logging.level, "warn"); // default
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "vsphere=debug"

            [connection]
            verify_tls = true
            timeout_secs = 120
            api_version = "7.0"

            [tasks]
            max_wait_secs = 10
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, "vsphere=debug");
        assert_eq!(config.connection.timeout_secs, 120);
        assert_eq!(config.connection.api_version, "7.0");
        assert_eq!(config.tasks.max_wait_secs, 10);
    }

    #[test]
    fn test_connection_config() {
        let toml = r#"
            [connection]
            timeout_secs = 90
            api_version = "8.0"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let conn = config.connection_config("vc.lab.local", 8443);
        assert_eq!(conn.sdk_url(), "https://vc.lab.local:8443/sdk");
        assert_eq!(conn.api_version, "8.0");
        assert_eq!(conn.timeout, Duration::from_secs(90));
        assert!(!conn.verify_tls);
    }

    #[test]
    fn test_wait_config() {
        let config: Config = toml::from_str("[tasks]\nmax_wait_secs = 5").unwrap();
        let wait = config.wait_config();
        assert_eq!(wait.max_wait, Duration::from_secs(5));
        assert_eq!(wait.timeout, None);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[connection\nverify_tls = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_long_poll_must_end_before_http_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.toml");
        std::fs::write(
            &path,
            "[connection]\ntimeout_secs = 10\n[tasks]\nmax_wait_secs = 120\n",
        )
        .unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "tasks.max_wait_secs"));
        assert!(err.to_string().contains("less than connection.timeout_secs (10)"));

        let config: Config = toml::from_str("[tasks]\nmax_wait_secs = 60").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_long_poll_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "[tasks]\nmax_wait_secs = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid config value 'tasks.max_wait_secs': must be at least 1"
        );
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(
            &path,
            "[connection]\ntimeout_secs = 90\n[tasks]\nmax_wait_secs = 60\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.wait_config().max_wait, Duration::from_secs(60));
    }

    #[test]
    fn test_load_optional_without_path() {
        let config = Config::load_optional(None).unwrap();
        assert_eq!(config.tasks.max_wait_secs, 30);
    }
}
