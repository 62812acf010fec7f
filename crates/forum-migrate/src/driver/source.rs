//! Table-backed batch sources.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::handler::{Batch, BatchHandle, BatchSource};
use crate::core::{Row, Value};
use crate::entity::CursorKind;
use crate::error::Result;
use crate::orchestrator::MigrationContext;
use crate::schema::ID_OLD;

/// Turns one raw source row into a destination-shaped row.
///
/// Returning `None` drops the row.
#[async_trait]
pub trait RowTranslator: Send + Sync {
    async fn translate(&self, ctx: &MigrationContext, raw: Row) -> Result<Option<Row>>;
}

/// Source rows already have the destination shape.
pub struct Identity;

#[async_trait]
impl RowTranslator for Identity {
    async fn translate(&self, _ctx: &MigrationContext, raw: Row) -> Result<Option<Row>> {
        Ok(Some(raw))
    }
}

/// A plain column mapping.
pub struct MapRow(pub fn(Row) -> Row);

#[async_trait]
impl RowTranslator for MapRow {
    async fn translate(&self, _ctx: &MigrationContext, raw: Row) -> Result<Option<Row>> {
        Ok(Some((self.0)(raw)))
    }
}

/// Pages through one source table.
///
/// Id cursors read `key >= cursor` in key order; ordinal cursors read
/// `LIMIT/OFFSET` over the full key order. For id cursors the old key is
/// written into `id_old` of every translated row.
pub struct SqlSource {
    table: &'static str,
    keys: &'static [&'static str],
    cursor: CursorKind,
    filter: Option<&'static str>,
    translator: Arc<dyn RowTranslator>,
}

impl SqlSource {
    /// Paged by the integer primary key `key`.
    pub fn by_id(
        table: &'static str,
        key: &'static [&'static str],
        translator: Arc<dyn RowTranslator>,
    ) -> Self {
        Self {
            table,
            keys: key,
            cursor: CursorKind::Id,
            filter: None,
            translator,
        }
    }

    /// Paged by row offset over the composite key `keys`.
    pub fn ordinal(
        table: &'static str,
        keys: &'static [&'static str],
        translator: Arc<dyn RowTranslator>,
    ) -> Self {
        Self {
            table,
            keys,
            cursor: CursorKind::Ordinal,
            filter: None,
            translator,
        }
    }

    /// Restrict the rows read with an SQL condition.
    pub fn filter(mut self, condition: &'static str) -> Self {
        self.filter = Some(condition);
        self
    }

    /// The query for the batch at `cursor`.
    pub fn select_sql(&self, limit: usize, cursor: i64) -> (String, Vec<Value>) {
        let order = self.keys.join(", ");
        match self.cursor {
            CursorKind::Id => {
                let mut sql = format!(
                    "SELECT * FROM ::{} WHERE {} >= ?",
                    self.table, self.keys[0]
                );
                if let Some(filter) = self.filter {
                    sql.push_str(&format!(" AND ({})", filter));
                }
                sql.push_str(&format!(" ORDER BY {} LIMIT {}", order, limit));
                (sql, vec![Value::from(cursor)])
            }
            CursorKind::Ordinal => {
                let mut sql = format!("SELECT * FROM ::{}", self.table);
                if let Some(filter) = self.filter {
                    sql.push_str(&format!(" WHERE {}", filter));
                }
                sql.push_str(&format!(
                    " ORDER BY {} LIMIT {} OFFSET {}",
                    order,
                    limit,
                    cursor.max(0)
                ));
                (sql, Vec::new())
            }
        }
    }
}

#[async_trait]
impl BatchSource for SqlSource {
    async fn begin(&self, ctx: &MigrationContext, cursor: i64) -> Result<Batch> {
        if !ctx.source.table_exists(self.table).await? {
            debug!("Source has no {} table", self.table);
            return Ok(Batch::NotApplicable);
        }

        let (sql, params) = self.select_sql(ctx.limit, cursor);
        let rows = ctx.source.query(&sql, &params).await?;
        let positioned = match self.cursor {
            CursorKind::Id => rows
                .into_iter()
                .map(|r| (r.int(self.keys[0]), r))
                .collect(),
            CursorKind::Ordinal => rows
                .into_iter()
                .enumerate()
                .map(|(i, r)| (cursor.max(0) + i as i64, r))
                .collect(),
        };
        Ok(Batch::Rows(BatchHandle::new(positioned)))
    }

    async fn next_row(
        &self,
        ctx: &MigrationContext,
        handle: &mut BatchHandle,
    ) -> Result<Option<Row>> {
        while let Some(raw) = handle.pop() {
            if let Some(mut row) = self.translator.translate(ctx, raw).await? {
                if self.cursor == CursorKind::Id {
                    if let Some(old) = handle.position() {
                        row.set(ID_OLD, old);
                    }
                }
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// Reads the whole source `config` table as one fixed list.
pub struct ConfigSource {
    translator: Arc<dyn RowTranslator>,
}

impl ConfigSource {
    pub fn new(translator: Arc<dyn RowTranslator>) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl BatchSource for ConfigSource {
    async fn begin(&self, ctx: &MigrationContext, _cursor: i64) -> Result<Batch> {
        if !ctx.source.table_exists("config").await? {
            return Ok(Batch::NotApplicable);
        }
        let rows = ctx
            .source
            .query(
                "SELECT conf_name, conf_value FROM ::config ORDER BY conf_name",
                &[],
            )
            .await?;
        Ok(Batch::Rows(BatchHandle::fixed(rows)))
    }

    async fn next_row(
        &self,
        ctx: &MigrationContext,
        handle: &mut BatchHandle,
    ) -> Result<Option<Row>> {
        while let Some(raw) = handle.pop() {
            if let Some(row) = self.translator.translate(ctx, raw).await? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// Move `from` to `to`, keeping `to` absent when `from` is.
pub(crate) fn rename(row: &mut Row, from: &str, to: &str) {
    if let Some(value) = row.remove(from) {
        row.set(to, value);
    }
}
