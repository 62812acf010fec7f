//! Old-id to new-id lookups through the `id_old` column.

use std::collections::HashMap;

use crate::core::Value;
use crate::db::Database;
use crate::entity::Entity;
use crate::error::{MigrateError, Result};
use crate::schema::table;

/// Chunk size for `IN (...)` lookups.
const LOOKUP_CHUNK: usize = 500;

/// Resolves source primary keys to destination primary keys.
pub struct IdRemapper<'a> {
    dest: &'a dyn Database,
}

impl<'a> IdRemapper<'a> {
    pub fn new(dest: &'a dyn Database) -> Self {
        Self { dest }
    }

    fn key_column(entity: Entity) -> Result<&'static str> {
        table(entity.table())
            .and_then(|def| def.serial_column())
            .ok_or_else(|| {
                MigrateError::contract(entity.name(), "entity has no serial key to remap through")
            })
    }

    /// New id of the row that came from `old`.
    pub async fn lookup(&self, entity: Entity, old: i64) -> Result<Option<i64>> {
        if old <= 0 {
            return Ok(None);
        }
        let key = Self::key_column(entity)?;
        let sql = format!(
            "SELECT {} AS id FROM ::{} WHERE id_old = ?",
            key,
            entity.table()
        );
        let row = self.dest.query_one(&sql, &[Value::from(old)]).await?;
        Ok(row.map(|r| r.int("id")))
    }

    /// New ids for several old ids; unresolved ids are absent from the map.
    pub async fn lookup_many(&self, entity: Entity, olds: &[i64]) -> Result<HashMap<i64, i64>> {
        let key = Self::key_column(entity)?;
        let mut wanted: Vec<i64> = olds.iter().copied().filter(|v| *v > 0).collect();
        wanted.sort_unstable();
        wanted.dedup();

        let mut found = HashMap::with_capacity(wanted.len());
        for chunk in wanted.chunks(LOOKUP_CHUNK) {
            let sql = format!(
                "SELECT {} AS id, id_old FROM ::{} WHERE id_old IN ({})",
                key,
                entity.table(),
                vec!["?"; chunk.len()].join(", ")
            );
            let params: Vec<Value> = chunk.iter().map(|v| Value::from(*v)).collect();
            for row in self.dest.query(&sql, &params).await? {
                found.insert(row.int("id_old"), row.int("id"));
            }
        }
        Ok(found)
    }
}
