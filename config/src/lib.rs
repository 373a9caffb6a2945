//! # Configuration Management for blogstore
//!
//! Database and logging settings, read from a TOML file with optional
//! `.env` support.
//!
//! ## Quick Start
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "blogstore"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 5
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```
//!
//! Load configuration:
//! ```no_run
//! use config::AppConfig;
//!
//! // Load from $BLOGSTORE_CONFIG or ./blogstore.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```
//!
//! When `DATABASE_URL` is set it replaces the connection target built
//! from the `[database]` fields; pool settings still come from the file.

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./blogstore.toml";
const CONFIG_PATH_VAR: &str = "BLOGSTORE_CONFIG";
const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    /// Full connection URL; takes precedence over the fields above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `blogstore=debug,sqlx=warn`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the TOML file named by `BLOGSTORE_CONFIG`
    /// (read after `.env`), falling back to `./blogstore.toml`, then to
    /// `DATABASE_URL` alone
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let database_url = env::var(DATABASE_URL_VAR).ok();

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::read_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::read_file(DEFAULT_CONFIG_PATH)?
        } else if let Some(url) = &database_url {
            Self::from_database_url(url)
        } else {
            return Err(ConfigError::Invalid(format!(
                "Config path must be specified as {} (environment or .env), in {}, or replaced by {}",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH, DATABASE_URL_VAR
            )));
        };

        let config = config.with_database_url(database_url);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with default pool and logging settings for `url`
    pub fn from_database_url(url: &str) -> Self {
        Self {
            database: DatabaseConfig::from_url(url),
            logging: LoggingConfig::default(),
        }
    }

    /// Replace the connection target when `url` is present
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.database.url = Some(url);
        }
        self
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Logging level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
            url: None,
        }
    }

    /// Configuration connecting to `url` with default pool settings
    pub fn from_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::new(
                "localhost".to_string(),
                5432,
                "blogstore".to_string(),
                "postgres".to_string(),
                String::new(),
                1,
                5,
                30,
                600,
                3600,
            )
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.url {
            Some(url) => {
                if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                    return Err(ConfigError::Invalid(
                        "Database url must start with postgres:// or postgresql://".to_string(),
                    ));
                }
            }
            None => {
                if self.host.is_empty() {
                    return Err(ConfigError::Invalid(
                        "Database host cannot be empty".to_string(),
                    ));
                }
                if self.port == 0 {
                    return Err(ConfigError::Invalid(
                        "Database port cannot be zero".to_string(),
                    ));
                }
                if self.database.is_empty() {
                    return Err(ConfigError::Invalid(
                        "Database name cannot be empty".to_string(),
                    ));
                }
                if self.username.is_empty() {
                    return Err(ConfigError::Invalid(
                        "Database username cannot be empty".to_string(),
                    ));
                }
            }
        }

        if self.min_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database min_connections must be greater than 0".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
