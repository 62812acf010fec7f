//! MySQL/MariaDB SQL dialect.

use super::{insert_prefix, Dialect};
use crate::core::identifier::quote_backtick;
use crate::schema::ColumnType;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+ and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Serial => "INT NOT NULL AUTO_INCREMENT",
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Varchar(_) => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::MediumText => "MEDIUMTEXT",
        }
    }

    // MySQL rejects literal defaults on TEXT/BLOB columns.
    fn text_defaults(&self) -> bool {
        false
    }

    fn table_options(&self) -> &'static str {
        " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    }

    fn drop_index_sql(&self, table: &str, index_name: &str) -> String {
        format!("DROP INDEX {} ON {}", self.quote_ident(index_name), table)
    }

    fn upsert_sql(&self, table: &str, columns: &[&str], key: &[&str]) -> String {
        let update: Vec<String> = columns
            .iter()
            .filter(|c| !key.contains(c))
            .map(|c| {
                let q = self.quote_ident(c);
                format!("{} = VALUES({})", q, q)
            })
            .collect();

        if update.is_empty() {
            return self.insert_ignore_sql(table, columns);
        }

        format!(
            "{} ON DUPLICATE KEY UPDATE {}",
            insert_prefix(self, table, columns),
            update.join(", ")
        )
    }

    fn insert_ignore_sql(&self, table: &str, columns: &[&str]) -> String {
        insert_prefix(self, table, columns).replacen("INSERT INTO", "INSERT IGNORE INTO", 1)
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?"
    }

    fn column_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?"
    }

    fn index_exists_sql(&self) -> &'static str {
        "SELECT 1 FROM information_schema.statistics \
         WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ? LIMIT 1"
    }
}
