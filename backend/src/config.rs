//! # Configuration
//!
//! Settings are read from a YAML file and then overridden from the
//! environment, so a deployment can keep credentials out of the file.
//!
//! ```yaml
//! database:
//!   host: localhost
//!   port: 3306
//!   name: finance.db
//!   user: finance
//!   password: secret
//!   max_connections: 5
//!   acquire_timeout_secs: 10
//! logging:
//!   level: info
//! ```
//!
//! Recognised environment overrides: `FINANCE_DB_HOST`, `FINANCE_DB_PORT`,
//! `FINANCE_DB_NAME`, `FINANCE_DB_USER`, `FINANCE_DB_PASSWORD`,
//! `FINANCE_DB_MAX_CONNECTIONS` and `FINANCE_LOG_LEVEL`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection parameters for the backing store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name; the embedded engine uses it as the database file path
    #[serde(default = "default_database_name")]
    pub name: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_database_name() -> String {
    "finance.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            name: default_database_name(),
            user: String::new(),
            password: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Options a server-based engine would need but the embedded one ignores
    pub fn server_options_in_use(&self) -> Vec<&'static str> {
        let mut in_use = Vec::new();
        if self.host != default_host() {
            in_use.push("host");
        }
        if self.port != default_port() {
            in_use.push("port");
        }
        if !self.user.is_empty() {
            in_use.push("user");
        }
        if !self.password.is_empty() {
            in_use.push("password");
        }
        in_use
    }
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(host) = lookup("FINANCE_DB_HOST") {
            db.host = host;
        }
        if let Some(port) = lookup("FINANCE_DB_PORT") {
            db.port = port
                .parse()
                .with_context(|| format!("FINANCE_DB_PORT is not a port number: {}", port))?;
        }
        if let Some(name) = lookup("FINANCE_DB_NAME") {
            db.name = name;
        }
        if let Some(user) = lookup("FINANCE_DB_USER") {
            db.user = user;
        }
        if let Some(password) = lookup("FINANCE_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(max) = lookup("FINANCE_DB_MAX_CONNECTIONS") {
            db.max_connections = max.parse().with_context(|| {
                format!("FINANCE_DB_MAX_CONNECTIONS is not a number: {}", max)
            })?;
        }
        if let Some(level) = lookup("FINANCE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }
}
