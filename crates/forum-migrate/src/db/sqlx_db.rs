//! [`Database`] over a sqlx `Any` pool (MySQL, PostgreSQL, SQLite).

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::error::ErrorKind;
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row as _};
use tracing::{debug, info};

use super::query::{expand, ExpandedSql};
use super::{Database, Statement};
use crate::config::ConnectionConfig;
use crate::core::identifier::validate_prefix;
use crate::core::{Row, Value};
use crate::dialect::{DbType, Dialect, DialectImpl};
use crate::error::{MigrateError, Result};

/// Pooled sqlx connection with a table prefix.
pub struct SqlxDatabase {
    pool: AnyPool,
    db_type: DbType,
    dialect: DialectImpl,
    prefix: String,
}

impl SqlxDatabase {
    /// Connect using a connection config.
    pub async fn connect(config: &ConnectionConfig, max_connections: u32) -> Result<Self> {
        Self::connect_url(
            &config.connection_url(),
            config.db_type,
            &config.prefix,
            max_connections,
        )
        .await
    }

    /// Connect to an explicit URL.
    pub async fn connect_url(
        url: &str,
        db_type: DbType,
        prefix: &str,
        max_connections: u32,
    ) -> Result<Self> {
        validate_prefix(prefix)?;
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        info!(
            "Connected to {} database (prefix {:?}, pool size {})",
            db_type, prefix, max_connections
        );

        Ok(Self {
            pool,
            db_type,
            dialect: DialectImpl::for_db(db_type),
            prefix: prefix.to_string(),
        })
    }

    fn prepare(&self, sql: &str) -> ExpandedSql {
        let expanded = expand(sql, &self.prefix, &self.dialect);
        debug!(sql = %expanded.sql, "executing");
        expanded
    }

    async fn exists(&self, sql: &str, params: &[Value]) -> Result<bool> {
        Ok(!self.query(sql, params).await?.is_empty())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode_value(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.into();
    }
    Value::Null
}

fn decode_row(row: &AnyRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), decode_value(row, i)))
        .collect()
}

/// Turn a driver error into a [`MigrateError`], recognising unique violations.
fn classify(err: sqlx::Error, expanded: &ExpandedSql) -> MigrateError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        let unique = matches!(db_err.kind(), ErrorKind::UniqueViolation)
            || message.contains("UNIQUE constraint failed")
            || message.contains("Duplicate entry")
            || message.contains("duplicate key");
        if unique {
            let detail = match db_err.constraint() {
                Some(constraint) => format!("{} ({})", message, constraint),
                None => message.to_string(),
            };
            return MigrateError::UniqueViolation {
                table: expanded.table.clone().unwrap_or_default(),
                detail,
                keys: violated_keys(message, db_err.constraint()),
            };
        }
        return MigrateError::query(&expanded.sql, message);
    }
    MigrateError::Database(err)
}

/// Names of the violated index or columns, without table qualifiers.
///
/// PostgreSQL reports the constraint separately; MySQL names the index in
/// `for key '...'`; SQLite lists `table.column` pairs after the colon.
fn violated_keys(message: &str, constraint: Option<&str>) -> Vec<String> {
    fn unqualified(name: &str) -> String {
        let name = name.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`');
        name.rsplit('.').next().unwrap_or(name).to_lowercase()
    }

    if let Some(constraint) = constraint {
        return vec![unqualified(constraint)];
    }
    if let Some(start) = message.rfind("for key '") {
        let rest = &message[start + "for key '".len()..];
        let name = rest.split('\'').next().unwrap_or(rest);
        return vec![unqualified(name)];
    }
    if let Some((_, columns)) = message.split_once("UNIQUE constraint failed:") {
        return columns.split(',').map(unqualified).collect();
    }
    if let Some(start) = message.find("unique constraint \"") {
        let rest = &message[start + "unique constraint \"".len()..];
        let name = rest.split('"').next().unwrap_or(rest);
        return vec![unqualified(name)];
    }
    Vec::new()
}

#[async_trait]
impl Database for SqlxDatabase {
    fn db_type(&self) -> DbType {
        self.db_type
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let expanded = self.prepare(sql);
        let rows = bind_all(sqlx::query(&expanded.sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, &expanded))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let expanded = self.prepare(sql);
        let result = bind_all(sqlx::query(&expanded.sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, &expanded))?;
        Ok(result.rows_affected())
    }

    async fn execute_batch(&self, statements: &[Statement]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for stmt in statements {
            let expanded = self.prepare(&stmt.sql);
            let result = bind_all(sqlx::query(&expanded.sql), &stmt.params)
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(e, &expanded))?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        self.exists(
            self.dialect.table_exists_sql(),
            &[Value::from(self.physical(name))],
        )
        .await
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.exists(
            self.dialect.column_exists_sql(),
            &[Value::from(self.physical(table)), Value::from(column)],
        )
        .await
    }

    async fn index_exists(&self, table: &str, suffix: &str) -> Result<bool> {
        self.exists(
            self.dialect.index_exists_sql(),
            &[
                Value::from(self.physical(table)),
                Value::from(self.index_name(table, suffix)),
            ],
        )
        .await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
