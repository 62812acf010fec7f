//! Destination schema description and evolution.
//!
//! - [`destination`]: the static catalogue of destination tables
//! - [`seed`]: baseline rows written into a freshly created schema
//! - [`evolver`]: schema creation and `id_old` tracking columns
//!
//! Table definitions are plain `'static` data; dialects turn them into DDL.

pub mod destination;
pub mod evolver;
pub mod seed;

pub use destination::{table, DESTINATION_REVISION, TABLES};
pub use evolver::SchemaEvolver;

use crate::core::{Row, Value};

/// Name of the temporary column holding a row's source primary key.
pub const ID_OLD: &str = "id_old";

/// Logical column type, mapped to concrete SQL by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-increment integer primary key.
    Serial,
    /// 8-bit integer (flags).
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Bounded string.
    Varchar(u32),
    /// Unbounded text.
    Text,
    /// Large text (post bodies).
    MediumText,
}

impl ColumnType {
    /// Whether values of this type are integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Serial
                | ColumnType::TinyInt
                | ColumnType::SmallInt
                | ColumnType::Int
                | ColumnType::BigInt
        )
    }
}

/// One destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    /// Integer default; text columns always default to the empty string.
    pub default: i64,
}

impl ColumnDef {
    /// The value used when a translated row omits this column.
    pub fn default_value(&self) -> Value {
        if self.ty.is_integer() {
            Value::Int(self.default)
        } else {
            Value::Text(String::new())
        }
    }
}

/// One secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Suffix of the index name; the full name is `{prefix}{table}_{name}`.
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

/// One destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static [&'static str],
    pub indexes: &'static [IndexDef],
}

impl TableDef {
    /// Look up a column definition.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The auto-increment column, if the table has one.
    pub fn serial_column(&self) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|c| c.ty == ColumnType::Serial)
            .map(|c| c.name)
    }

    /// Column names, excluding the serial column.
    pub fn data_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .filter(|c| c.ty != ColumnType::Serial)
            .map(|c| c.name)
    }

    /// Shape a translated row for this table.
    ///
    /// Columns unknown to the table are dropped (except `id_old`, which is
    /// handled by the writer), missing columns get their defaults.
    pub fn conform(&self, row: &Row) -> Row {
        let mut out = Row::new();
        for col in self.columns {
            if col.ty == ColumnType::Serial {
                continue;
            }
            match row.get(col.name) {
                Some(Value::Null) | None => out.set(col.name, col.default_value()),
                Some(value) => out.set(col.name, coerce(col, value)),
            }
        }
        out
    }
}

fn coerce(col: &ColumnDef, value: &Value) -> Value {
    if col.ty.is_integer() {
        Value::Int(value.as_i64().unwrap_or(col.default))
    } else {
        match value {
            Value::Text(_) => value.clone(),
            other => Value::Text(other.to_text()),
        }
    }
}

pub(crate) const fn serial(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Serial,
        default: 0,
    }
}

pub(crate) const fn int(name: &'static str, default: i64) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Int,
        default,
    }
}

pub(crate) const fn tiny(name: &'static str, default: i64) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::TinyInt,
        default,
    }
}

pub(crate) const fn small(name: &'static str, default: i64) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::SmallInt,
        default,
    }
}

pub(crate) const fn big(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::BigInt,
        default: 0,
    }
}

pub(crate) const fn varchar(name: &'static str, len: u32) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Varchar(len),
        default: 0,
    }
}

pub(crate) const fn text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::Text,
        default: 0,
    }
}

pub(crate) const fn medium_text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        ty: ColumnType::MediumText,
        default: 0,
    }
}

pub(crate) const fn index(name: &'static str, columns: &'static [&'static str]) -> IndexDef {
    IndexDef {
        name,
        columns,
        unique: false,
    }
}

pub(crate) const fn unique(name: &'static str, columns: &'static [&'static str]) -> IndexDef {
    IndexDef {
        name,
        columns,
        unique: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conform_fills_defaults_and_drops_unknown() {
        let users = table("users").unwrap();
        let row = Row::new()
            .with("username", "bob")
            .with("icq", "12345")
            .with("num_posts", "17");
        let out = users.conform(&row);

        assert_eq!(out.text("username"), "bob");
        assert_eq!(out.int("num_posts"), 17);
        assert!(!out.contains("icq"));
        assert!(!out.contains("id"));
        assert_eq!(out.int("disp_topics"), 0);
        assert_eq!(out.text("signature"), "");
    }

    #[test]
    fn test_conform_coerces_text_to_integer() {
        let topics = table("topics").unwrap();
        let out = topics.conform(&Row::new().with("closed", Value::Text("1".into())));
        assert_eq!(out.get("closed"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_serial_column() {
        assert_eq!(table("groups").unwrap().serial_column(), Some("g_id"));
        assert_eq!(table("forum_perms").unwrap().serial_column(), None);
    }
}
