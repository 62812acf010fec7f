//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::core::identifier::validate_prefix;
use crate::dialect::DbType;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source", &config.source)?;
    validate_connection("target", &config.target)?;

    // Cannot migrate into the database being read
    if config.source.connection_url() == config.target.connection_url()
        && config.source.prefix == config.target.prefix
    {
        return Err(MigrateError::Config(
            "source and target cannot be the same database and prefix".into(),
        ));
    }

    if config.migration.limit == 0 {
        return Err(MigrateError::Config(
            "migration.limit must be at least 1".into(),
        ));
    }
    if config.migration.state_ttl_hours == 0 {
        return Err(MigrateError::Config(
            "migration.state_ttl_hours must be at least 1".into(),
        ));
    }
    if config.migration.max_connections == 0 {
        return Err(MigrateError::Config(
            "migration.max_connections must be at least 1".into(),
        ));
    }

    Ok(())
}

fn validate_connection(side: &str, conn: &ConnectionConfig) -> Result<()> {
    validate_prefix(&conn.prefix)
        .map_err(|e| MigrateError::Config(format!("{}.prefix: {}", side, e)))?;

    if conn.url.is_some() {
        return Ok(());
    }
    if conn.database.is_empty() {
        return Err(MigrateError::Config(format!(
            "{}.database is required",
            side
        )));
    }
    if conn.db_type != DbType::Sqlite {
        if conn.host.is_empty() {
            return Err(MigrateError::Config(format!("{}.host is required", side)));
        }
        if conn.user.is_empty() {
            return Err(MigrateError::Config(format!("{}.user is required", side)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationConfig;

    fn conn(db_type: DbType, database: &str, prefix: &str) -> ConnectionConfig {
        ConnectionConfig {
            db_type,
            host: "localhost".to_string(),
            port: None,
            database: database.to_string(),
            user: "forum".to_string(),
            password: "secret".to_string(),
            prefix: prefix.to_string(),
            url: None,
        }
    }

    fn valid_config() -> Config {
        Config {
            source: conn(DbType::Mysql, "fluxbb", "flux_"),
            target: conn(DbType::Postgres, "forkbb", "fork_"),
            migration: MigrationConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_database() {
        let mut config = valid_config();
        config.source.database = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.database"));
    }

    #[test]
    fn test_sqlite_needs_no_host_or_user() {
        let mut config = valid_config();
        config.target = conn(DbType::Sqlite, "/tmp/forum.db", "");
        config.target.host = String::new();
        config.target.user = String::new();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_prefix() {
        let mut config = valid_config();
        config.target.prefix = "fork-".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("target.prefix"));
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config = valid_config();
        config.target = config.source.clone();
        assert!(validate(&config).is_err());

        // Same database, different prefixes is allowed
        config.target.prefix = "fork_".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_limit() {
        let mut config = valid_config();
        config.migration.limit = 0;
        assert!(validate(&config).is_err());
    }
}
