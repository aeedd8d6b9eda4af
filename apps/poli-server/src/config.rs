//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     POLI_PORT=8080                                                     │
//! │     DATABASE_PATH=/var/lib/poli/poli.db                                │
//! │                                                                         │
//! │  2. TOML Config File (path in POLI_CONFIG)                             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:3000, ./poli.db, UTC-3                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # poli.toml
//! [server]
//! bind_address = "127.0.0.1"
//! port = 3000
//! log_filter = "info,poli=debug,sqlx=warn"
//!
//! [database]
//! path = "/var/lib/poli/poli.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! cash_register_id = "default-cash-register"
//! business_utc_offset_minutes = -180
//!
//! [backup]
//! directory = "/var/backups/poli"
//! ```
//!
//! ## Environment Variables
//! | Variable | Field |
//! |----------|-------|
//! | `POLI_CONFIG` | path of the TOML file |
//! | `POLI_BIND_ADDRESS` | `server.bind_address` |
//! | `POLI_PORT` | `server.port` |
//! | `POLI_LOG` | `server.log_filter` |
//! | `DATABASE_PATH` | `database.path` |
//! | `POLI_MAX_CONNECTIONS` | `database.max_connections` |
//! | `POLI_BUSY_TIMEOUT_MS` | `database.busy_timeout_ms` |
//! | `POLI_CASH_REGISTER_ID` | `ledger.cash_register_id` |
//! | `POLI_BUSINESS_UTC_OFFSET_MINUTES` | `ledger.business_utc_offset_minutes` |
//! | `POLI_BACKUP_DIR` | `backup.directory` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use poli_core::{DEFAULT_BUSINESS_UTC_OFFSET_MINUTES, DEFAULT_CASH_REGISTER_ID};
use poli_db::{DbConfig, LedgerConfig};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,poli=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    /// `EnvFilter` directives; `RUST_LOG` wins over this.
    pub log_filter: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a ledger writer waits for the write lock.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: PathBuf::from("./poli.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub cash_register_id: String,
    /// Restaurant offset from UTC, in minutes east (Asunción is -180).
    pub business_utc_offset_minutes: i32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            cash_register_id: DEFAULT_CASH_REGISTER_ID.to_string(),
            business_utc_offset_minutes: DEFAULT_BUSINESS_UTC_OFFSET_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Where `POST /api/config/backup` writes database copies.
    pub directory: PathBuf,
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings {
            directory: PathBuf::from("./backups"),
        }
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub backup: BackupSettings,
}

impl ServerConfig {
    /// Loads configuration from defaults, the `POLI_CONFIG` file and the
    /// environment, in that order (later overrides earlier).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("POLI_CONFIG").ok().map(PathBuf::from);
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::load`] with an explicit file and variable lookup.
    pub fn load_with(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => {
                info!(?path, "Loading server config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                Self::from_toml_str(&contents)?
            }
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(env)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.backup.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("backup.directory is required".into()));
        }

        if self.ledger.cash_register_id.trim().is_empty() {
            return Err(ConfigError::Invalid("ledger.cash_register_id is required".into()));
        }

        self.ledger_config()?;

        Ok(())
    }

    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(address) = env("POLI_BIND_ADDRESS") {
            self.server.bind_address = address;
        }

        if let Some(port) = env("POLI_PORT") {
            self.server.port = parse_var("POLI_PORT", &port)?;
            debug!(port = self.server.port, "Overriding port from environment");
        }

        if let Some(filter) = env("POLI_LOG") {
            self.server.log_filter = filter;
        }

        if let Some(path) = env("DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = env("POLI_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("POLI_MAX_CONNECTIONS", &max)?;
        }

        if let Some(timeout) = env("POLI_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_var("POLI_BUSY_TIMEOUT_MS", &timeout)?;
        }

        if let Some(id) = env("POLI_CASH_REGISTER_ID") {
            self.ledger.cash_register_id = id;
        }

        if let Some(offset) = env("POLI_BUSINESS_UTC_OFFSET_MINUTES") {
            self.ledger.business_utc_offset_minutes =
                parse_var("POLI_BUSINESS_UTC_OFFSET_MINUTES", &offset)?;
        }

        if let Some(dir) = env("POLI_BACKUP_DIR") {
            self.backup.directory = PathBuf::from(dir);
        }

        Ok(())
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// `address:port` to bind the listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn ledger_config(&self) -> Result<LedgerConfig, ConfigError> {
        LedgerConfig::new(
            self.ledger.cash_register_id.clone(),
            self.ledger.business_utc_offset_minutes,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load_with(None, env_of(&[])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database.path, PathBuf::from("./poli.db"));
        assert_eq!(config.ledger.cash_register_id, DEFAULT_CASH_REGISTER_ID);
        assert_eq!(config.ledger.business_utc_offset_minutes, -180);
        assert_eq!(config.server.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.backup.directory, PathBuf::from("./backups"));
    }

    #[test]
    fn test_partial_toml() {
        let config = ServerConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [ledger]
            business_utc_offset_minutes = -240
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.ledger.business_utc_offset_minutes, -240);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = std::env::temp_dir().join(format!("poli-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poli.toml");
        std::fs::write(&path, "[server]\nport = 8080\n\n[database]\npath = \"file.db\"\n").unwrap();

        let config = ServerConfig::load_with(
            Some(path),
            env_of(&[
                ("POLI_PORT", "9090"),
                ("POLI_CASH_REGISTER_ID", "caja-2"),
                ("POLI_BACKUP_DIR", "/srv/poli/backups"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.path, PathBuf::from("file.db"));
        assert_eq!(config.ledger.cash_register_id, "caja-2");
        assert_eq!(config.backup.directory, PathBuf::from("/srv/poli/backups"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_values() {
        let bad_port = ServerConfig::load_with(None, env_of(&[("POLI_PORT", "lots")]));
        assert!(matches!(bad_port, Err(ConfigError::InvalidValue { .. })));

        let bad_offset = ServerConfig::load_with(
            None,
            env_of(&[("POLI_BUSINESS_UTC_OFFSET_MINUTES", "100000")]),
        );
        assert!(matches!(bad_offset, Err(ConfigError::Invalid(_))));

        let missing = ServerConfig::load_with(Some(PathBuf::from("/nonexistent/poli.toml")), env_of(&[]));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
