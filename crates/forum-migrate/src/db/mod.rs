//! Database collaborator.
//!
//! The engine never talks to a driver directly. Everything goes through
//! [`Database`], which executes logical SQL (see [`query`]) against one
//! connection pool with a fixed table prefix.

pub mod query;
mod sqlx_db;

use async_trait::async_trait;

pub use query::{expand, ExpandedSql};
pub use sqlx_db::SqlxDatabase;

use crate::core::{Row, Value};
use crate::dialect::{insert_prefix, DbType, Dialect, DialectImpl};
use crate::error::Result;

/// One statement with its parameters, for [`Database::execute_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Plain insert of every column of `row` into logical `table`.
    pub fn insert(dialect: &dyn Dialect, table: &str, row: &Row) -> Self {
        let (columns, params) = split(row);
        Self::new(
            insert_prefix(dialect, &format!("::{}", table), &columns),
            params,
        )
    }

    /// Insert that updates the existing row with the same `key`.
    pub fn upsert(dialect: &dyn Dialect, table: &str, row: &Row, key: &[&str]) -> Self {
        let (columns, params) = split(row);
        Self::new(
            dialect.upsert_sql(&format!("::{}", table), &columns, key),
            params,
        )
    }

    /// Insert that skips rows colliding with an existing key.
    pub fn insert_ignore(dialect: &dyn Dialect, table: &str, row: &Row) -> Self {
        let (columns, params) = split(row);
        Self::new(
            dialect.insert_ignore_sql(&format!("::{}", table), &columns),
            params,
        )
    }
}

fn split(row: &Row) -> (Vec<&str>, Vec<Value>) {
    row.iter().map(|(c, v)| (c, v.clone())).unzip()
}

/// Parameterized access to one database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Database kind.
    fn db_type(&self) -> DbType;

    /// Table prefix applied to `::name` references.
    fn prefix(&self) -> &str;

    /// SQL dialect of this database.
    fn dialect(&self) -> &DialectImpl;

    /// Run a query and collect its rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run statements in order inside a single transaction.
    async fn execute_batch(&self, statements: &[Statement]) -> Result<u64>;

    /// Whether logical table `name` exists.
    async fn table_exists(&self, name: &str) -> Result<bool>;

    /// Whether logical table `table` has `column`.
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Whether logical table `table` has an index with suffix `suffix`.
    async fn index_exists(&self, table: &str, suffix: &str) -> Result<bool>;

    /// Close the pool.
    async fn close(&self);

    /// Prefixed physical table name.
    fn physical(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }

    /// Quoted, prefixed table name for hand-built statements.
    fn table(&self, name: &str) -> String {
        self.dialect().quote_ident(&self.physical(name))
    }

    /// Physical index name: `{prefix}{table}_{suffix}`.
    fn index_name(&self, table: &str, suffix: &str) -> String {
        format!("{}{}_{}", self.prefix(), table, suffix)
    }

    /// First row of a query, if any.
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    /// First column of the first row as an integer; 0 when there is no row.
    async fn query_int(&self, sql: &str, params: &[Value]) -> Result<i64> {
        let row = self.query_one(sql, params).await?;
        Ok(row
            .and_then(|r| r.iter().next().and_then(|(_, v)| v.as_i64()))
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_builders_use_logical_tables() {
        let dialect = DialectImpl::for_db(DbType::Sqlite);
        let row = Row::new().with("sm_code", ":)").with("sm_image", "smile.png");

        let insert = Statement::insert(&dialect, "smilies", &row);
        assert_eq!(
            insert.sql,
            "INSERT INTO ::smilies (\"sm_code\", \"sm_image\") VALUES (?, ?)"
        );
        assert_eq!(insert.params, vec![Value::from(":)"), Value::from("smile.png")]);

        let upsert = Statement::upsert(&dialect, "smilies", &row, &["sm_code"]);
        assert!(upsert.sql.starts_with("INSERT INTO ::smilies"));
        assert!(upsert.sql.ends_with("DO UPDATE SET \"sm_image\" = EXCLUDED.\"sm_image\""));

        let expanded = expand(&upsert.sql, "fork_", &dialect);
        assert!(expanded.sql.starts_with("INSERT INTO \"fork_smilies\""));
    }
}
