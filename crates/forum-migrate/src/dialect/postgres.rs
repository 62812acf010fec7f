//! PostgreSQL SQL dialect.

use super::{insert_prefix, Dialect};
use crate::core::identifier::quote_double;
use crate::schema::ColumnType;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Serial => "SERIAL",
            ColumnType::TinyInt | ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Varchar(_) => "VARCHAR",
            ColumnType::Text | ColumnType::MediumText => "TEXT",
        }
    }

    fn upsert_sql(&self, table: &str, columns: &[&str], key: &[&str]) -> String {
        on_conflict_upsert(self, table, columns, key)
    }

    fn insert_ignore_sql(&self, table: &str, columns: &[&str]) -> String {
        format!("{} ON CONFLICT DO NOTHING", insert_prefix(self, table, columns))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ?"
    }

    fn column_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = ? AND column_name = ?"
    }

    fn index_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM pg_indexes \
         WHERE schemaname = current_schema() AND tablename = ? AND indexname = ?"
    }

    fn reset_sequence_sql(&self, table: &str, column: &str) -> Option<String> {
        let col = self.quote_ident(column);
        Some(format!(
            "SELECT setval(pg_get_serial_sequence('{}', '{}'), \
             COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
            table.replace('\'', "''"),
            column.replace('\'', "''"),
            col,
            table
        ))
    }
}

/// `INSERT ... ON CONFLICT (key) DO UPDATE`, shared with SQLite.
pub(super) fn on_conflict_upsert(
    dialect: &dyn Dialect,
    table: &str,
    columns: &[&str],
    key: &[&str],
) -> String {
    let update: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(c))
        .map(|c| {
            let q = dialect.quote_ident(c);
            format!("{} = EXCLUDED.{}", q, q)
        })
        .collect();

    let action = if update.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", update.join(", "))
    };

    format!(
        "{} ON CONFLICT ({}) {}",
        insert_prefix(dialect, table, columns),
        dialect.column_list(key),
        action
    )
}
