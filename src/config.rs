//! Configuration module for docportal.

use serde::Deserialize;
use std::path::Path;

use crate::{PortalError, Result};

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which every folder and file is stored.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_root() -> String {
    "data/storage".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/docportal.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/docportal.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PortalError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PortalError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DOCPORTAL_STORAGE_ROOT`: Override the storage root directory
    /// - `DOCPORTAL_DATABASE_PATH`: Override the SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("DOCPORTAL_STORAGE_ROOT") {
            if !root.is_empty() {
                self.storage.root = root;
            }
        }
        if let Ok(path) = std::env::var("DOCPORTAL_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The storage root is empty
    /// - The upload size limit is zero
    /// - The connection pool size is zero
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.trim().is_empty() {
            return Err(PortalError::Config("storage.root must not be empty".to_string()));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(PortalError::Config(
                "storage.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(PortalError::Config(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.root, "data/storage");
        assert_eq!(config.storage.max_upload_size_mb, 50);
        assert_eq!(config.storage.max_upload_bytes(), 50 * 1024 * 1024);

        assert_eq!(config.database.path, "data/docportal.db");
        assert_eq!(config.database.max_connections, 5);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/docportal.log");

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[storage]
root = "/srv/portal"

[logging]
level = "debug"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.storage.root, "/srv/portal");
        assert_eq!(config.storage.max_upload_size_mb, 50);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database.path, "data/docportal.db");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.storage.root, "data/storage");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[storage\nroot = ");
        assert!(matches!(result, Err(PortalError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/docportal.toml");
        assert!(matches!(result, Err(PortalError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\npath = \"portal.db\"\nmax_connections = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database.path, "portal.db");
        assert_eq!(config.database.max_connections, 2);
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let mut config = Config::default();
        config.storage.root = "   ".to_string();
        assert!(matches!(config.validate(), Err(PortalError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_upload_limit() {
        let mut config = Config::default();
        config.storage.max_upload_size_mb = 0;
        assert!(config.validate().is_err());
    }
}
