use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::git::executor::DEFAULT_MAX_OUTPUT_BYTES;

/// Environment variable naming the working tree to serve
pub const REPO_PATH_ENV: &str = "GIT_REPO_PATH";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub git: GitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working tree root; the current directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    pub timeout_seconds: u64,
    pub max_output_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `gitboard=debug`
    pub level: String,
    pub audit_log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Config::default_config().server
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Config::default_config().git
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Config::default_config().logging
    }
}

impl Config {
    /// Config directory under `home`
    pub fn config_dir(home: &Path) -> PathBuf {
        home.join(".config").join("gitboard")
    }

    /// Config file path under `home`
    pub fn config_path(home: &Path) -> PathBuf {
        Self::config_dir(home).join("config.toml")
    }

    /// Load configuration from the default location
    ///
    /// A missing file, or a missing `HOME`, is not an error; defaults are
    /// used instead.
    pub fn load() -> Result<Self, ConfigError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::load_in_home(home.as_deref())
    }

    /// Load `config.toml` from the config directory under `home`
    pub fn load_in_home(home: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(home) = home else {
            tracing::warn!("HOME is not set, using default configuration");
            return Ok(Self::default_config());
        };

        let path = Self::config_path(home);
        if !path.exists() {
            return Ok(Self::default_config());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        // Validate config
        config.validate()?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Validate before saving
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            repository: RepositoryConfig { path: None },
            git: GitConfig {
                timeout_seconds: 30,
                max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                audit_log: true,
                audit_log_path: None,
            },
        }
    }

    /// Apply `GIT_REPO_PATH` and `PORT` using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(REPO_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.repository.path = Some(PathBuf::from(path));
        }

        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{} is not a valid port: {}", PORT_ENV, port))
            })?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "server.host must not be empty".to_string(),
            ));
        }

        // Validate git timeout
        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Large histories and diffs must not be cut short
        if self.git.max_output_bytes < DEFAULT_MAX_OUTPUT_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "max_output_bytes must be at least {}",
                DEFAULT_MAX_OUTPUT_BYTES
            )));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "logging.level must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Working tree to serve: the configured path, else the current directory
    pub fn repo_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.repository.path {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git.timeout_seconds)
    }
}
