//! Database kind definitions and connection configuration.
//!
//! This module contains:
//! - `DatabaseType` - Enum of supported database kinds
//! - `ConnectionConfig` - Unified connection configuration
//! - `ConnectionParams` - Kind-specific connection parameters

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::database::error::{DriverError, Result};

/// Supported database kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Sqlite,
    MySql,
    Postgres,
}

impl DatabaseType {
    /// Get the display name for this database kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// Get the default port for server-based databases
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Sqlite => None, // File-based
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
        }
    }

    /// Check if this database kind is file-based
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Sqlite)
    }

    /// Parse from a string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgresql" | "postgres" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Convert to the string representation used in persisted configs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Unified connection configuration for all database kinds.
///
/// `name` is the unique key a configuration is registered and cached under.
/// A config is immutable once a driver has been built from it; changing any
/// field requires re-registering under the same name and reconnecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique, user-chosen name for this connection
    pub name: String,
    /// The kind of database
    pub database_type: DatabaseType,
    /// Connection parameters (varies by database kind)
    pub params: ConnectionParams,
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new(name: String, database_type: DatabaseType, params: ConnectionParams) -> Self {
        Self {
            name,
            database_type,
            params,
        }
    }

    /// Validate that the params match the database kind
    pub fn validate(&self) -> Result<()> {
        match (&self.database_type, &self.params) {
            (DatabaseType::Sqlite, ConnectionParams::Server { .. }) => {
                Err(DriverError::Validation(format!(
                    "{} requires file or in-memory connection parameters",
                    self.database_type.display_name()
                )))
            }
            (
                DatabaseType::MySql | DatabaseType::Postgres,
                ConnectionParams::File { .. } | ConnectionParams::InMemory,
            ) => Err(DriverError::Validation(format!(
                "{} requires server connection parameters",
                self.database_type.display_name()
            ))),
            _ => Ok(()),
        }
    }

    /// Get a human-readable description of the target, typically
    /// "user@host:port/database" for server connections or the file path
    /// for file-based ones.
    pub fn display_target(&self) -> String {
        match &self.params {
            ConnectionParams::Server {
                hostname,
                port,
                username,
                database,
                ..
            } => format!("{}@{}:{}/{}", username, hostname, port, database),
            ConnectionParams::File { path } => path.display().to_string(),
            ConnectionParams::InMemory => ":memory:".to_string(),
        }
    }
}

/// Connection parameters for the different database kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionParams {
    /// Server-based databases (MySQL, PostgreSQL)
    Server {
        /// Server hostname or IP address
        hostname: String,
        /// Server port
        port: u16,
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
        /// Database to connect to
        database: String,
    },

    /// File-based databases (SQLite)
    File {
        /// Path to the database file
        path: PathBuf,
    },

    /// In-memory databases (SQLite)
    InMemory,
}

impl ConnectionParams {
    /// Create new server connection parameters
    pub fn server(
        hostname: String,
        port: u16,
        username: String,
        password: String,
        database: String,
    ) -> Self {
        Self::Server {
            hostname,
            port,
            username,
            password,
            database,
        }
    }

    /// Create new file connection parameters
    pub fn file(path: PathBuf) -> Self {
        Self::File { path }
    }

    /// Get the hostname if this is a server connection
    pub fn hostname(&self) -> Option<&str> {
        match self {
            Self::Server { hostname, .. } => Some(hostname),
            _ => None,
        }
    }

    /// Get the database name if this is a server connection
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::Server { database, .. } => Some(database),
            _ => None,
        }
    }

    /// Get the file path if this is a file connection
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::File { path } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_display_names() {
        assert_eq!(DatabaseType::Sqlite.display_name(), "SQLite");
        assert_eq!(DatabaseType::MySql.display_name(), "MySQL");
        assert_eq!(DatabaseType::Postgres.display_name(), "PostgreSQL");
    }

    #[test]
    fn test_database_type_default_ports() {
        assert_eq!(DatabaseType::Sqlite.default_port(), None);
        assert_eq!(DatabaseType::MySql.default_port(), Some(3306));
        assert_eq!(DatabaseType::Postgres.default_port(), Some(5432));
    }

    #[test]
    fn test_database_type_parse() {
        assert_eq!(DatabaseType::parse("sqlite"), Some(DatabaseType::Sqlite));
        assert_eq!(DatabaseType::parse("SQLite3"), Some(DatabaseType::Sqlite));
        assert_eq!(DatabaseType::parse("mariadb"), Some(DatabaseType::MySql));
        assert_eq!(DatabaseType::parse("pg"), Some(DatabaseType::Postgres));
        assert_eq!(DatabaseType::parse("oracle"), None);
    }

    #[test]
    fn test_connection_config_validation() {
        // Valid: PostgreSQL with server params
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::Postgres,
            ConnectionParams::server(
                "localhost".to_string(),
                5432,
                "user".to_string(),
                "pass".to_string(),
                "db".to_string(),
            ),
        );
        assert!(config.validate().is_ok());

        // Invalid: PostgreSQL with file params
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::Postgres,
            ConnectionParams::file(PathBuf::from("/tmp/test.db")),
        );
        assert!(config.validate().is_err());

        // Valid: SQLite with file params
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::Sqlite,
            ConnectionParams::file(PathBuf::from("/tmp/test.db")),
        );
        assert!(config.validate().is_ok());

        // Invalid: SQLite with server params
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::Sqlite,
            ConnectionParams::server(
                "localhost".to_string(),
                5432,
                "user".to_string(),
                "pass".to_string(),
                "db".to_string(),
            ),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_serialization() {
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::MySql,
            ConnectionParams::server(
                "localhost".to_string(),
                3306,
                "user".to_string(),
                "pass".to_string(),
                "db".to_string(),
            ),
        );

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ConnectionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, deserialized);
        assert!(json.contains("\"mysql\""));
    }

    #[test]
    fn test_display_target() {
        let config = ConnectionConfig::new(
            "prod".to_string(),
            DatabaseType::Postgres,
            ConnectionParams::server(
                "db.internal".to_string(),
                5432,
                "app".to_string(),
                "secret".to_string(),
                "orders".to_string(),
            ),
        );
        assert_eq!(config.display_target(), "app@db.internal:5432/orders");

        let config = ConnectionConfig::new(
            "local".to_string(),
            DatabaseType::Sqlite,
            ConnectionParams::file(PathBuf::from("/tmp/app.db")),
        );
        assert_eq!(config.display_target(), "/tmp/app.db");
    }
}
