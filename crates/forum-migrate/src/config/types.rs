//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dialect::DbType;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy forum database (read only).
    pub source: ConnectionConfig,

    /// Destination forum database.
    pub target: ConnectionConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// One database connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type: mysql, postgres or sqlite.
    #[serde(rename = "type")]
    pub db_type: DbType,

    /// Hostname (ignored for SQLite).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port; the database default when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name, or file path for SQLite.
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Table prefix, e.g. `fluxbb_`.
    #[serde(default)]
    pub prefix: String,

    /// Full connection URL; overrides every field above except `type` and `prefix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("prefix", &self.prefix)
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ConnectionConfig {
    /// Build a sqlx connection URL.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        match self.db_type {
            DbType::Sqlite => format!("sqlite://{}?mode=rwc", self.database),
            db_type => {
                let port = self.port.or(db_type.default_port()).unwrap_or_default();
                let auth = if self.user.is_empty() {
                    String::new()
                } else if self.password.is_empty() {
                    format!("{}@", urlencoding::encode(&self.user))
                } else {
                    format!(
                        "{}:{}@",
                        urlencoding::encode(&self.user),
                        urlencoding::encode(&self.password)
                    )
                };
                format!(
                    "{}://{}{}:{}/{}",
                    db_type.scheme(),
                    auth,
                    self.host,
                    port,
                    self.database
                )
            }
        }
    }

    /// Short human-readable location, without credentials.
    pub fn display_location(&self) -> String {
        match self.db_type {
            DbType::Sqlite => format!("sqlite:{}", self.database),
            db_type => format!(
                "{}://{}:{}/{}",
                db_type,
                self.host,
                self.port.or(db_type.default_port()).unwrap_or_default(),
                self.database
            ),
        }
    }
}

/// Requested run mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSelection {
    /// Decide from the destination contents and the detected driver.
    #[default]
    Auto,
    Copy,
    Merge,
    ExactCopy,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source driver name, or `auto` to detect.
    #[serde(default = "default_driver")]
    pub driver: String,

    #[serde(default)]
    pub mode: ModeSelection,

    /// Rows per batch.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Directory for persisted run state.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Hours a run stays resumable after its last step.
    #[serde(default = "default_state_ttl_hours")]
    pub state_ttl_hours: u32,

    /// Pool size per database.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            mode: ModeSelection::default(),
            limit: default_limit(),
            state_dir: default_state_dir(),
            state_ttl_hours: default_state_ttl_hours(),
            max_connections: default_max_connections(),
        }
    }
}

impl MigrationConfig {
    /// Whether the driver should be detected.
    pub fn auto_driver(&self) -> bool {
        self.driver.is_empty() || self.driver.eq_ignore_ascii_case("auto")
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_driver() -> String {
    "auto".to_string()
}

fn default_limit() -> usize {
    100
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".forum-migrate")
}

fn default_state_ttl_hours() -> u32 {
    6
}

fn default_max_connections() -> u32 {
    4
}
