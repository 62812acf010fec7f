//! SQLite SQL dialect.

use super::postgres::on_conflict_upsert;
use super::{insert_prefix, Dialect};
use crate::core::identifier::quote_double;
use crate::schema::ColumnType;

/// SQLite dialect implementation (3.35+ for `DROP COLUMN`).
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Serial => "INTEGER PRIMARY KEY AUTOINCREMENT",
            ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Int
            | ColumnType::BigInt => "INTEGER",
            ColumnType::Varchar(_) => "VARCHAR",
            ColumnType::Text | ColumnType::MediumText => "TEXT",
        }
    }

    fn inline_serial_key(&self) -> bool {
        true
    }

    fn upsert_sql(&self, table: &str, columns: &[&str], key: &[&str]) -> String {
        on_conflict_upsert(self, table, columns, key)
    }

    fn insert_ignore_sql(&self, table: &str, columns: &[&str]) -> String {
        format!("{} ON CONFLICT DO NOTHING", insert_prefix(self, table, columns))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?"
    }

    fn column_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM pragma_table_info(?) WHERE name = ?"
    }

    fn index_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?"
    }
}
