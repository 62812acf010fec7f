//! SQL dialects (Strategy pattern).
//!
//! Each supported database gets a small strategy object that knows its
//! identifier quoting, parameter placeholders, column types and the few
//! statements whose syntax differs (upserts, index drops, introspection).
//! [`DialectImpl`] dispatches statically over the three implementations.

mod mysql;
mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::MigrateError;
use crate::schema::{ColumnDef, ColumnType, IndexDef, TableDef};

/// Database kind of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Mysql,
    Postgres,
    Sqlite,
}

impl DbType {
    /// URL scheme understood by the sqlx `Any` driver.
    pub fn scheme(self) -> &'static str {
        match self {
            DbType::Mysql => "mysql",
            DbType::Postgres => "postgres",
            DbType::Sqlite => "sqlite",
        }
    }

    /// Default TCP port, if the database is networked.
    pub fn default_port(self) -> Option<u16> {
        match self {
            DbType::Mysql => Some(3306),
            DbType::Postgres => Some(5432),
            DbType::Sqlite => None,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for DbType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DbType::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DbType::Postgres),
            "sqlite" => Ok(DbType::Sqlite),
            other => Err(MigrateError::Config(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

/// SQL syntax strategy.
///
/// Table arguments are always already quoted and prefixed; index and
/// introspection arguments are raw names.
pub trait Dialect: Send + Sync {
    /// Dialect identifier.
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Concrete SQL type for a logical column type.
    fn column_type(&self, ty: ColumnType) -> &'static str;

    /// Whether TEXT columns accept a literal default.
    fn text_defaults(&self) -> bool {
        true
    }

    /// Whether the serial column declares its own primary key.
    fn inline_serial_key(&self) -> bool {
        false
    }

    /// Trailing table options of `CREATE TABLE`.
    fn table_options(&self) -> &'static str {
        ""
    }

    /// Column definition without its name.
    fn column_sql(&self, col: &ColumnDef) -> String {
        let ty = self.column_type(col.ty);
        match col.ty {
            ColumnType::Serial => ty.to_string(),
            t if t.is_integer() => format!("{} NOT NULL DEFAULT {}", ty, col.default),
            ColumnType::Text | ColumnType::MediumText if !self.text_defaults() => {
                format!("{} NOT NULL", ty)
            }
            ColumnType::Varchar(len) => format!("{}({}) NOT NULL DEFAULT ''", ty, len),
            _ => format!("{} NOT NULL DEFAULT ''", ty),
        }
    }

    /// `CREATE TABLE` statement for a table definition.
    fn create_table_sql(&self, table: &str, def: &TableDef) -> String {
        let mut parts: Vec<String> = def
            .columns
            .iter()
            .map(|c| format!("{} {}", self.quote_ident(c.name), self.column_sql(c)))
            .collect();

        if !(self.inline_serial_key() && def.serial_column().is_some()) {
            parts.push(format!("PRIMARY KEY ({})", self.column_list(def.primary_key)));
        }

        format!(
            "CREATE TABLE {} ({}){}",
            table,
            parts.join(", "),
            self.table_options()
        )
    }

    /// `CREATE INDEX` statement.
    fn create_index_sql(&self, table: &str, index_name: &str, index: &IndexDef) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(index_name),
            table,
            self.column_list(index.columns)
        )
    }

    /// `DROP INDEX` statement.
    fn drop_index_sql(&self, _table: &str, index_name: &str) -> String {
        format!("DROP INDEX {}", self.quote_ident(index_name))
    }

    /// Add an integer column with a zero default.
    fn add_int_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {} NOT NULL DEFAULT 0",
            table,
            self.quote_ident(column),
            self.column_type(ColumnType::Int)
        )
    }

    /// Drop a column.
    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            table,
            self.quote_ident(column)
        )
    }

    /// Single-row insert that updates the row holding the same `key`.
    fn upsert_sql(&self, table: &str, columns: &[&str], key: &[&str]) -> String;

    /// Single-row insert that silently skips duplicates of the primary key.
    fn insert_ignore_sql(&self, table: &str, columns: &[&str]) -> String;

    /// Query returning a row when table `?` exists.
    fn table_exists_sql(&self) -> &'static str;

    /// Query returning a row when table `?` has column `?`.
    fn column_exists_sql(&self) -> &'static str;

    /// Query returning a row when table `?` has index `?`.
    fn index_exists_sql(&self) -> &'static str;

    /// Statement re-aligning the sequence behind a serial column after
    /// explicit ids were inserted, if the dialect needs one.
    fn reset_sequence_sql(&self, _table: &str, _column: &str) -> Option<String> {
        None
    }

    /// Comma-separated quoted column list.
    fn column_list(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build `INSERT INTO t (cols) VALUES (?, ...)` with `?` placeholders.
pub(crate) fn insert_prefix(dialect: &dyn Dialect, table: &str, columns: &[&str]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        dialect.column_list(columns),
        vec!["?"; columns.len()].join(", ")
    )
}

/// Enum wrapper for dialect implementations.
///
/// Dispatches through a match statement instead of vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
}

impl DialectImpl {
    /// The dialect for a database kind.
    pub fn for_db(db_type: DbType) -> Self {
        match db_type {
            DbType::Mysql => DialectImpl::Mysql(MysqlDialect),
            DbType::Postgres => DialectImpl::Postgres(PostgresDialect),
            DbType::Sqlite => DialectImpl::Sqlite(SqliteDialect),
        }
    }

    fn inner(&self) -> &dyn Dialect {
        match self {
            DialectImpl::Mysql(d) => d,
            DialectImpl::Postgres(d) => d,
            DialectImpl::Sqlite(d) => d,
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn quote_ident(&self, name: &str) -> String {
        self.inner().quote_ident(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        self.inner().param_placeholder(index)
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        self.inner().column_type(ty)
    }

    fn text_defaults(&self) -> bool {
        self.inner().text_defaults()
    }

    fn inline_serial_key(&self) -> bool {
        self.inner().inline_serial_key()
    }

    fn table_options(&self) -> &'static str {
        self.inner().table_options()
    }

    fn column_sql(&self, col: &ColumnDef) -> String {
        self.inner().column_sql(col)
    }

    fn drop_index_sql(&self, table: &str, index_name: &str) -> String {
        self.inner().drop_index_sql(table, index_name)
    }

    fn upsert_sql(&self, table: &str, columns: &[&str], key: &[&str]) -> String {
        self.inner().upsert_sql(table, columns, key)
    }

    fn insert_ignore_sql(&self, table: &str, columns: &[&str]) -> String {
        self.inner().insert_ignore_sql(table, columns)
    }

    fn table_exists_sql(&self) -> &'static str {
        self.inner().table_exists_sql()
    }

    fn column_exists_sql(&self) -> &'static str {
        self.inner().column_exists_sql()
    }

    fn index_exists_sql(&self) -> &'static str {
        self.inner().index_exists_sql()
    }

    fn reset_sequence_sql(&self, table: &str, column: &str) -> Option<String> {
        self.inner().reset_sequence_sql(table, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::table;

    #[test]
    fn test_db_type_parse() {
        assert_eq!("MySQL".parse::<DbType>().unwrap(), DbType::Mysql);
        assert_eq!("postgresql".parse::<DbType>().unwrap(), DbType::Postgres);
        assert_eq!("sqlite".parse::<DbType>().unwrap(), DbType::Sqlite);
        assert!("oracle".parse::<DbType>().is_err());
    }

    #[test]
    fn test_serial_key_placement() {
        let groups = table("groups").unwrap();

        let sqlite = DialectImpl::for_db(DbType::Sqlite);
        let sql = sqlite.create_table_sql("\"groups\"", groups);
        assert!(sql.contains("\"g_id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(!sql.contains("PRIMARY KEY (\"g_id\")"));

        let pg = DialectImpl::for_db(DbType::Postgres);
        let sql = pg.create_table_sql("\"groups\"", groups);
        assert!(sql.contains("\"g_id\" SERIAL"));
        assert!(sql.contains("PRIMARY KEY (\"g_id\")"));
    }

    #[test]
    fn test_composite_key_table() {
        let perms = table("forum_perms").unwrap();
        let mysql = DialectImpl::for_db(DbType::Mysql);
        let sql = mysql.create_table_sql("`forum_perms`", perms);
        assert!(sql.contains("PRIMARY KEY (`group_id`, `forum_id`)"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }

    #[test]
    fn test_text_columns_have_no_default_on_mysql() {
        let col = ColumnDef {
            name: "signature",
            ty: ColumnType::Text,
            default: 0,
        };
        assert_eq!(DialectImpl::for_db(DbType::Mysql).column_sql(&col), "TEXT NOT NULL");
        assert_eq!(
            DialectImpl::for_db(DbType::Postgres).column_sql(&col),
            "TEXT NOT NULL DEFAULT ''"
        );
    }

    #[test]
    fn test_index_sql() {
        let idx = IndexDef {
            name: "username_normal_idx",
            columns: &["username_normal"],
            unique: true,
        };
        let d = DialectImpl::for_db(DbType::Postgres);
        assert_eq!(
            d.create_index_sql("\"fm_users\"", "fm_users_username_normal_idx", &idx),
            "CREATE UNIQUE INDEX \"fm_users_username_normal_idx\" ON \"fm_users\" (\"username_normal\")"
        );
    }
}
