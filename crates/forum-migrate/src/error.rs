//! Error types for the migration library.

use thiserror::Error;

use crate::driver::Incompatibility;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database driver error (connection, SQL execution, decoding).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A query failed; carries the expanded SQL for diagnosis.
    #[error("Query failed: {message}\n  SQL: {sql}")]
    Query { sql: String, message: String },

    /// Uniqueness constraint violated on insert/update. `keys` holds the
    /// violated index or column names as reported by the driver.
    #[error("Unique constraint violated on {table}: {detail}")]
    UniqueViolation {
        table: String,
        detail: String,
        keys: Vec<String>,
    },

    /// Collision resolution ran out of candidate names.
    #[error("Could not resolve collision for {column} value {value:?} after {attempts} attempts")]
    CollisionLimit {
        column: String,
        value: String,
        attempts: usize,
    },

    /// A driver handler broke its contract (failed write, failed finalize, ...).
    #[error("Entity {entity} failed: {message}")]
    Contract { entity: String, message: String },

    /// An operator-visible precondition is not met; nothing was modified.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The tracking column already holds data from an earlier, unfinished run.
    #[error("Table {table} already has populated id_old values - a previous migration was not cleaned up")]
    TrackingColumnPopulated { table: String },

    /// Copy mode was requested against a destination that already has data.
    #[error("Destination database is not empty (found table {table})")]
    DestinationNotEmpty { table: String },

    /// No registered driver accepted the source database.
    #[error("No driver recognises the source database:\n{}", format_reasons(.0))]
    NoCompatibleDriver(Vec<(String, Incompatibility)>),

    /// A driver name that is not registered.
    #[error("Unknown source driver: {0}")]
    UnknownDriver(String),

    /// State persistence error
    #[error("State error: {0}")]
    State(String),

    /// Persisted state has outlived its time-to-live.
    #[error("Migration state for run {0} has expired")]
    StateExpired(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

fn format_reasons(reasons: &[(String, Incompatibility)]) -> String {
    reasons
        .iter()
        .map(|(name, reason)| format!("  {}: {}", name, reason))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MigrateError {
    /// Create a Contract error for an entity.
    pub fn contract(entity: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Contract {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a Query error.
    pub fn query(sql: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Query {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a uniqueness violation of `column` or of its
    /// `{column}_normal` companion.
    ///
    /// Only the violated key names are consulted, never the message, which
    /// may quote the duplicate value. A key is either a bare column
    /// (`username_normal`) or an index named `{prefix}{table}_{column}_idx`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        let MigrateError::UniqueViolation { keys, .. } = self else {
            return false;
        };
        let normal = format!("{}_normal", column);
        let suffixes = [format!("_{}", column), format!("_{}", normal)];
        keys.iter().any(|key| {
            let key = key.strip_suffix("_idx").unwrap_or(key);
            key == column || key == normal || suffixes.iter().any(|s| key.ends_with(s.as_str()))
        })
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Precondition(_)
            | MigrateError::TrackingColumnPopulated { .. }
            | MigrateError::DestinationNotEmpty { .. }
            | MigrateError::NoCompatibleDriver(_)
            | MigrateError::UnknownDriver(_) => 3,
            MigrateError::Database(_)
            | MigrateError::Query { .. }
            | MigrateError::UniqueViolation { .. }
            | MigrateError::CollisionLimit { .. }
            | MigrateError::Contract { .. } => 4,
            MigrateError::State(_) | MigrateError::StateExpired(_) | MigrateError::Json(_) => 5,
            MigrateError::Cancelled => 130,
            MigrateError::Io(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
